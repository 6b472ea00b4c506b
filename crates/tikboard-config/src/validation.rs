//! Validation utilities and regex patterns

use crate::defaults::VALID_PAGE_TYPES;
use regex::Regex;
use std::sync::LazyLock;
use validator::ValidationError;

/// Regex pattern for validating hex color codes (e.g., #FFFFFF, #FF0000)
pub static HEX_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("Invalid hex color regex pattern")
});

/// Validate a `#RRGGBB` colour
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_hex_color"))
    }
}

/// Validate a tracing level name
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level")),
    }
}

/// Validate that a page type is one the click log can carry
pub fn validate_page_type(page_type: &str) -> Result<(), ValidationError> {
    if VALID_PAGE_TYPES.contains(&page_type) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_page_type"))
    }
}

/// Validate a tracked link: must carry a host after the optional scheme
pub fn validate_link(link: &str) -> Result<(), ValidationError> {
    let rest = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);
    let host = rest.split('/').next().unwrap_or_default();
    if host.contains('.') && !host.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_link"))
    }
}

/// Validate file path (basic check for valid path characters)
pub fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::new("empty_file_path"));
    }

    let invalid_chars = ['<', '>', '"', '|', '?', '*'];
    if path.chars().any(|c| invalid_chars.contains(&c)) {
        return Err(ValidationError::new("invalid_file_path_characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_regex() {
        assert!(validate_hex_color("#FFFFFF").is_ok());
        assert!(validate_hex_color("#abc123").is_ok());

        assert!(validate_hex_color("FFFFFF").is_err());
        assert!(validate_hex_color("#FFF").is_err());
        assert!(validate_hex_color("#GGGGGG").is_err());
        assert!(validate_hex_color("").is_err());
    }

    #[test]
    fn test_validate_log_level() {
        assert!(validate_log_level("debug").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn test_validate_page_type() {
        assert!(validate_page_type("videos").is_ok());
        assert!(validate_page_type("download").is_ok());
        assert!(validate_page_type("other").is_ok());
        assert!(validate_page_type("Videos").is_err());
        assert!(validate_page_type("landing").is_err());
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link("https://insnap.ai/videos").is_ok());
        assert!(validate_link("insnap.ai/zh/download").is_ok());
        assert!(validate_link("https:///videos").is_err());
        assert!(validate_link("videos").is_err());
    }

    #[test]
    fn test_validate_file_path() {
        assert!(validate_file_path("data/redash_data").is_ok());
        assert!(validate_file_path("").is_err());
        assert!(validate_file_path("file|name.csv").is_err());
    }
}
