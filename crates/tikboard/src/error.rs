//! Application-wide error types using thiserror.

use tikboard_common::DashError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Loading, aggregation or rendering failed.
    #[error(transparent)]
    Dash(#[from] DashError),

    /// Sources could not be loaded and merged.
    #[error("Load failed: {0}")]
    Load(String),

    /// The requested output needs data that was not loaded.
    #[error("No data: {0}")]
    NoData(String),

    /// Writing command output failed.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the command-line application.
pub type AppResult<T> = Result<T, AppError>;
