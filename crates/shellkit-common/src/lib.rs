//! # ShellKit Common
//!
//! Common utilities shared by the ShellKit crates.
//!
//! ## Features
//!
//! - Logging configuration and setup
//! - Timeout utility for bounding async operations

use std::time::Duration;
use thiserror::Error;

pub mod logging;
pub mod timeout;

pub use logging::{init_logging, LogConfig, LogFormat};
pub use timeout::with_timeout;

/// Error type for ShellKit utilities.
#[derive(Error, Debug)]
pub enum ShellKitError {
    /// Timeout errors.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for ShellKit operations.
pub type Result<T> = std::result::Result<T, ShellKitError>;
