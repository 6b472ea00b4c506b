//! Application configuration structures

use crate::defaults;
use crate::mapping::{GroupMappingTable, GroupPageRule, LinkGroupRule};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tikboard_common::{LogFormat, LoggingConfig};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Where the three inputs come from
    #[validate(nested)]
    pub sources: SourcesConfig,

    /// Remote fetch settings
    #[validate(nested)]
    pub http: HttpConfig,

    /// Link and page-type rules
    pub mapping: MappingConfig,

    /// Chart rendering settings
    #[validate(nested)]
    pub charts: ChartSettings,

    /// Load memo and snapshot settings
    #[validate(nested)]
    pub cache: CacheSettings,

    /// Logging configuration
    #[validate(nested)]
    pub logging: LoggingSettings,

    /// Directory receiving exports and charts
    #[validate(custom(function = "crate::validation::validate_file_path"))]
    pub output_dir: String,
}

/// Locations of the roster, counter export and click log
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourcesConfig {
    /// Account roster (spreadsheet or CSV)
    #[validate(nested)]
    pub roster: SourceConfig,
    /// Daily counter export
    #[validate(nested)]
    pub counters: SourceConfig,
    /// Click log
    #[validate(nested)]
    pub clicks: SourceConfig,
}

/// Declared file format of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Delimited text
    Csv,
    /// Spreadsheet workbook
    Xlsx,
}

/// One input source: a local file or directory with an optional remote fallback
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourceConfig {
    /// File, or directory scanned for the newest matching file
    pub path: Option<String>,

    /// Required file-name prefix when `path` is a directory
    pub file_prefix: Option<String>,

    /// Remote URL fetched when no local file is found
    #[validate(url(message = "Source URL must be a valid URL"))]
    pub url: Option<String>,

    /// Explicit format; inferred from the extension when unset
    pub format: Option<SourceFormat>,
}

impl SourceConfig {
    /// Source backed by a single local file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Source backed by the newest matching file in a directory.
    pub fn directory(path: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            file_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Whether anything at all is configured.
    pub fn is_configured(&self) -> bool {
        self.path.is_some() || self.url.is_some()
    }
}

/// Remote fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

/// Ordered link and page-type rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Tracked links, first match wins
    pub links: Vec<LinkGroupRule>,
    /// Group fragments to page types, first match wins
    pub pages: Vec<GroupPageRule>,
}

impl MappingConfig {
    /// Build the session's mapping table.
    pub fn to_table(&self) -> GroupMappingTable {
        GroupMappingTable::new(self.links.clone(), self.pages.clone())
    }
}

/// Chart rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ChartSettings {
    /// Image width in pixels
    #[validate(range(min = 200, max = 4000, message = "Width must be between 200 and 4000 pixels"))]
    pub width: u32,

    /// Image height in pixels
    #[validate(range(min = 150, max = 4000, message = "Height must be between 150 and 4000 pixels"))]
    pub height: u32,

    /// Background colour (hex)
    #[validate(custom(function = "crate::validation::validate_hex_color", message = "Background color must be valid hex color"))]
    pub background_color: String,

    /// Series colours (hex), cycled
    pub palette: Vec<String>,

    /// Whether to draw grid lines
    pub show_grid: bool,

    /// Title font size
    #[validate(range(min = 8, max = 72, message = "Font size must be between 8 and 72"))]
    pub title_font_size: u32,
}

/// Load memo and warm-start snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of memoised source loads
    #[validate(range(min = 1, max = 10000, message = "Memo capacity must be between 1 and 10000"))]
    pub memo_capacity: u64,

    /// JSON snapshot of the merged table
    pub snapshot_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[validate(custom(function = "crate::validation::validate_log_level", message = "Log level must be one of: trace, debug, info, warn, error"))]
    pub level: String,

    /// Line layout
    pub format: LogFormat,

    /// Optional log file path
    pub file: Option<String>,

    /// Whether to emit span open/close events
    pub include_spans: bool,
}

impl Config {
    /// Comprehensive validation of the entire configuration
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        self.mapping.to_table().validate_rules()?;
        self.charts.validate_palette()?;
        Ok(())
    }

    /// The session's mapping table.
    pub fn mapping_table(&self) -> GroupMappingTable {
        self.mapping.to_table()
    }

    /// Output directory as a path.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

impl ChartSettings {
    /// Every palette entry must be a hex colour and the palette must not be empty.
    pub fn validate_palette(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = validator::ValidationErrors::new();

        if self.palette.is_empty() {
            errors.add("palette", validator::ValidationError::new("empty_palette"));
        }
        for color in &self.palette {
            if let Err(err) = crate::validation::validate_hex_color(color) {
                errors.add("palette", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl LoggingSettings {
    /// Convert into the subscriber configuration.
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.level.clone(),
            format: self.format,
            file_path: self.file.clone(),
            include_spans: self.include_spans,
            ..LoggingConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            http: HttpConfig::default(),
            mapping: MappingConfig::default(),
            charts: ChartSettings::default(),
            cache: CacheSettings::default(),
            logging: LoggingSettings::default(),
            output_dir: defaults::OUTPUT_DIR.to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            roster: SourceConfig::file(defaults::ROSTER_PATH),
            counters: SourceConfig::directory(defaults::COUNTERS_DIR, defaults::COUNTERS_PREFIX),
            clicks: SourceConfig::directory(defaults::CLICKS_DIR, ""),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::HTTP_TIMEOUT_SECONDS,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            links: defaults::link_rules(),
            pages: defaults::page_rules(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            background_color: "#FFFFFF".to_string(),
            palette: defaults::chart_palette(),
            show_grid: true,
            title_font_size: 20,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memo_capacity: defaults::MEMO_CAPACITY,
            snapshot_path: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
            include_spans: false,
        }
    }
}
