//! # tikboard common
//!
//! Shared types, the error taxonomy, logging bootstrap and small parsing
//! helpers used by every crate in the tikboard workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{DashError, Result};
pub use logging::{init_default_logging, init_dev_logging, init_logging, LogFormat, LoggingConfig};
pub use types::*;
pub use utils::*;
