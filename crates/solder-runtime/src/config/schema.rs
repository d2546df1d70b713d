//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use solder_core::{DEFAULT_RATE_BURST, DEFAULT_RATE_PER_SEC, DEFAULT_WORKERS, DispatchConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolderConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch pipeline settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,
}

/// Settings for the dispatch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Token-bucket burst capacity per actor.
    #[serde(default = "default_rate_burst")]
    pub rate_burst: u32,

    /// Sustained admissions per second per actor.
    #[serde(default = "default_rate_per_sec")]
    pub rate_per_sec: f64,

    /// Cap on concurrently running handler tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the inbound update channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            rate_burst: default_rate_burst(),
            rate_per_sec: default_rate_per_sec(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchSettings {
    /// Converts to the core dispatch config.
    pub fn to_core(&self) -> DispatchConfig {
        DispatchConfig {
            rate_burst: self.rate_burst,
            rate_per_sec: self.rate_per_sec,
            workers: self.workers,
        }
    }
}

fn default_rate_burst() -> u32 {
    DEFAULT_RATE_BURST
}

fn default_rate_per_sec() -> f64 {
    DEFAULT_RATE_PER_SEC
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> usize {
    1024
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Minimum level to emit.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread IDs in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line number in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module level overrides, e.g. `solder_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Log verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name as a filter directive understands it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing::Level`.
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line output with abbreviated fields.
    #[default]
    Compact,
    /// The default `tracing` formatter.
    Full,
    /// Multi-line human-friendly output.
    Pretty,
    /// Structured JSON lines; requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}
