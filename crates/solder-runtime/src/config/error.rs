//! Failure surface of configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading the first source and
/// handing out a validated [`SolderConfig`](super::SolderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A pinned configuration file does not exist.
    #[error("Configuration file missing: {0}")]
    FileNotFound(PathBuf),

    #[error("Configuration file unreadable: {0}")]
    ReadError(#[from] std::io::Error),

    /// The assembled sources do not deserialize into the schema.
    #[error("Configuration rejected: {0}")]
    ParseError(String),

    /// A value deserialized fine but fails a semantic check.
    #[error("Configuration invalid: {message}")]
    ValidationError { message: String },

    /// A conditionally required field is absent.
    #[error("Configuration field required: {field}")]
    MissingField { field: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::ValidationError`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Shorthand for [`ConfigError::MissingField`].
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
