//! Structured logging setup shared by the library crates and the CLI

use crate::{DashError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Output layout of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human friendly
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "tikboard_data=debug")
    pub level: String,
    /// Line layout
    pub format: LogFormat,
    /// Optional file path; logs are appended there instead of stderr
    pub file_path: Option<String>,
    /// Whether to emit span open/close events
    pub include_spans: bool,
    /// Whether to include target module information
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
            include_spans: false,
            include_targets: true,
        }
    }
}

fn open_log_file(path: &str) -> Result<Mutex<File>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Mutex::new(file))
}

/// Initialize the global tracing subscriber.
///
/// An unparseable level falls back to `info`. Calling this twice returns an
/// error rather than panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let base = fmt::layer()
        .with_span_events(span_events.clone())
        .with_target(config.include_targets)
        .with_writer(std::io::stderr);

    let outcome = match (config.format, config.file_path.as_deref()) {
        (LogFormat::Pretty, None) => registry.with(base.pretty()).try_init(),
        (LogFormat::Compact, None) => registry.with(base.compact()).try_init(),
        (LogFormat::Json, None) => registry.with(base.json()).try_init(),
        (format, Some(path)) => {
            let file_layer = fmt::layer()
                .with_span_events(span_events)
                .with_target(config.include_targets)
                .with_ansi(false)
                .with_writer(open_log_file(path)?);
            match format {
                LogFormat::Json => registry.with(file_layer.json()).try_init(),
                LogFormat::Compact => registry.with(file_layer.compact()).try_init(),
                LogFormat::Pretty => registry.with(file_layer).try_init(),
            }
        }
    };

    outcome.map_err(|e| DashError::config_with_source("Failed to initialize logging", e))
}

/// Initialize logging with default configuration
pub fn init_default_logging() -> Result<()> {
    init_logging(&LoggingConfig::default())
}

/// Initialize logging for development (pretty, debug level, spans on)
pub fn init_dev_logging() -> Result<()> {
    init_logging(&LoggingConfig {
        level: "debug".to_string(),
        include_spans: true,
        ..LoggingConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_path.is_none());
        assert!(!config.include_spans);
        assert!(config.include_targets);
    }

    #[test]
    fn test_log_format_deserializes_lowercase() {
        let format: LogFormat = serde_yaml::from_str("compact").unwrap();
        assert_eq!(format, LogFormat::Compact);
        let format: LogFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/tikboard.log");
        let path = path.to_string_lossy().to_string();
        assert!(open_log_file(&path).is_ok());
        assert!(Path::new(&path).exists());
    }
}
