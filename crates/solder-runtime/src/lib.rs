//! Solder Runtime - Orchestration layer for the Solder dispatch framework.
//!
//! This crate provides:
//! - Runtime orchestration (`Runtime`, `RuntimeBuilder`)
//! - Layered configuration loading (`ConfigLoader`, `SolderConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - Signal-driven shutdown (Ctrl+C, SIGTERM)
//!
//! # Configuration Features
//!
//! Config file formats are gated behind cargo features:
//!
//! - `toml-config`: TOML configuration files (`solder.toml`)
//! - `yaml-config`: YAML configuration files (`solder.yaml`)
//! - `json-log`: JSON-formatted log output
//!
//! ```ignore
//! use solder_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> solder_runtime::RuntimeResult<()> {
//!     // Runtime auto-loads config and initializes logging
//!     Runtime::new()
//!         .with_source(polling_source)
//!         .with_handler(MyHandler::new())
//!         .run()
//!         .await
//! }
//! ```
//!
//! # Custom Configuration (Optional)
//!
//! You can layer configuration sources explicitly if needed:
//!
//! ```ignore
//! use solder_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> solder_runtime::RuntimeResult<()> {
//!     let runtime = Runtime::builder()
//!         .config_file("config/solder.production.toml")
//!         .profile("production")
//!         .build()?;
//!
//!     runtime
//!         .with_source(polling_source)
//!         .with_handler(MyHandler::new())
//!         .run()
//!         .await
//! }
//! ```
//!
//! # Shutdown Semantics
//!
//! `run` stops on Ctrl+C or SIGTERM; `run_until` stops when an arbitrary
//! future resolves. Either way the cancellation token tears down the
//! source and router tasks without draining in-flight handler work.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchSettings, LogFormat, LogLevel, LogOutput,
    LoggingConfig, Profile, SolderConfig, load_config, load_config_from_file, validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{Runtime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
