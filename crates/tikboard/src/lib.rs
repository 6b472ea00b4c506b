//! # tikboard
//!
//! Command-line front end: loads the configured sources into a dashboard
//! session and prints summaries, increments and conversion tables, writes
//! CSV exports and renders charts.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod cli;
pub mod error;
pub mod report;

pub use app::{App, Rendered};
pub use cli::{Cli, Command, SnapshotAction};
pub use error::{AppError, AppResult};
