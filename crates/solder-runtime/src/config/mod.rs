//! Configuration for the dispatch runtime.
//!
//! [`schema`] declares what can be configured and [`loader`] layers the
//! sources into a [`SolderConfig`]. The semantic checks applied before a
//! config is handed out live in [`validation`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{DispatchSettings, LogFormat, LogLevel, LogOutput, LoggingConfig, SolderConfig};
pub use validation::validate_config;
