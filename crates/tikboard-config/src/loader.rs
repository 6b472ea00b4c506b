//! Configuration loading utilities

use crate::defaults::{CONFIG_FILE_CANDIDATES, CONFIG_PATH_ENV};
use crate::Config;
use std::env;
use std::path::Path;
use thiserror::Error;
use tikboard_common::{DashError, Result as DashResult};
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParseError {
        /// Variable name
        var: String,
        /// Parse failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<ConfigError> for DashError {
    fn from(err: ConfigError) -> Self {
        DashError::config_with_source("Configuration loading failed", err)
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_with(&content, |key| env::var(key).ok())?;
        info!(path = %path.as_ref().display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse YAML, apply overrides from `lookup` and validate.
    pub fn from_yaml_with<F>(content: &str, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content)?
        };
        Self::apply_overrides_from(&mut config, lookup)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from the environment-named file, a file in the
    /// working directory, or defaults
    pub fn load() -> DashResult<Config> {
        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            return Ok(Self::load_config(&config_path)?);
        }

        if let Some(candidate) = CONFIG_FILE_CANDIDATES
            .iter()
            .find(|candidate| Path::new(candidate).exists())
        {
            return Ok(Self::load_config(candidate)?);
        }

        debug!("No configuration file found, using defaults");
        let mut config = Config::default();
        Self::apply_overrides_from(&mut config, |key| env::var(key).ok())?;
        config.validate_all().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> DashResult<Config> {
        Ok(Self::load_config(path)?)
    }

    /// Apply `TIKBOARD_*` overrides; `lookup` resolves a variable name.
    pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = &mut config.sources;
        for (prefix, source) in [
            ("ROSTER", &mut sources.roster),
            ("COUNTERS", &mut sources.counters),
            ("CLICKS", &mut sources.clicks),
        ] {
            if let Some(path) = lookup(&format!("TIKBOARD_{prefix}_PATH")) {
                source.path = Some(path);
            }
            if let Some(url) = lookup(&format!("TIKBOARD_{prefix}_URL")) {
                source.url = Some(url).filter(|u| !u.trim().is_empty());
            }
        }

        if let Some(timeout) = lookup("TIKBOARD_HTTP_TIMEOUT") {
            config.http.timeout_seconds =
                timeout.trim().parse().map_err(|e| ConfigError::EnvParseError {
                    var: "TIKBOARD_HTTP_TIMEOUT".to_string(),
                    source: Box::new(e),
                })?;
        }

        if let Some(level) = lookup("TIKBOARD_LOG_LEVEL") {
            config.logging.level = level.trim().to_lowercase();
        }

        if let Some(dir) = lookup("TIKBOARD_OUTPUT_DIR") {
            config.output_dir = dir;
        }

        if let Some(path) = lookup("TIKBOARD_SNAPSHOT_PATH") {
            config.cache.snapshot_path = Some(path);
        }

        Ok(())
    }
}
