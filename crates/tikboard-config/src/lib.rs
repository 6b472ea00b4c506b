//! Configuration management for tikboard

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod defaults;
pub mod loader;
pub mod mapping;
pub mod settings;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use mapping::{GroupMappingTable, GroupPageRule, LinkGroupRule, MappingStatistics};
pub use settings::{
    CacheSettings, ChartSettings, Config, HttpConfig, LoggingSettings, MappingConfig,
    SourceConfig, SourceFormat, SourcesConfig,
};
