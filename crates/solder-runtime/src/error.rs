//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use solder_core::DispatchError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The dispatch pipeline failed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// `run` was called without an update source installed.
    #[error("No update source installed")]
    MissingSource,

    /// `run` was called without an event handler installed.
    #[error("No event handler installed")]
    MissingHandler,

    /// The router task ended abnormally.
    #[error("Router task failed: {0}")]
    RouterPanicked(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
