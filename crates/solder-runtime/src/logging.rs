//! Log output for the dispatch runtime.
//!
//! Everything in solder emits through `tracing`; this module owns the
//! subscriber side. [`init_from_config`] installs the subscriber described
//! by a [`LoggingConfig`], and [`LoggingBuilder`] offers the same knobs to
//! code that bypasses the config system:
//!
//! ```rust,ignore
//! use solder_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .with_level(tracing::Level::DEBUG)
//!     .directive("solder_core::router=trace")
//!     .init();
//! ```
//!
//! A `RUST_LOG` variable in the environment replaces the configured base
//! level. The `json-log` feature unlocks the JSON format; without it a
//! configured JSON format degrades to compact text.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig};

/// Installs the global subscriber described by `config`.
///
/// A second call finds the subscriber slot taken and changes nothing, so
/// embedders that already initialized logging keep their setup.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Assembles and installs the global tracing subscriber.
///
/// The display toggles mirror [`LoggingConfig`];
/// [`from_config`](LoggingBuilder::from_config) bridges the two.
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_file: bool,
    with_line_number: bool,
    file_path: Option<PathBuf>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            with_target: true,
            ..Default::default()
        }
    }

    /// Maps a [`LoggingConfig`] onto builder state.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let directives = config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={}", level.as_str()))
            .collect();

        Self {
            directives,
            level: Some(config.level.to_tracing_level()),
            format: config.format,
            output: config.output,
            with_target: true,
            with_thread_ids: config.thread_ids,
            with_file: config.file_location,
            with_line_number: config.file_location,
            file_path: config.file_path.clone(),
        }
    }

    /// Sets the base level events must clear to be emitted.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds one `target=level` filter directive.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Selects the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Selects where log lines go.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Shows or hides the emitting module path.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Shows or hides thread IDs.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Shows or hides source file names.
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    /// Shows or hides source line numbers.
    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.with_line_number = enabled;
        self
    }

    /// Names the log file used with [`LogOutput::File`].
    pub fn file_path(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    /// Resolves the effective filter. `RUST_LOG` wins over the configured
    /// base level; explicit directives stack on top either way.
    fn build_filter(&self) -> EnvFilter {
        let base = self
            .level
            .unwrap_or(tracing::Level::INFO)
            .to_string()
            .to_lowercase();

        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));

        for directive in &self.directives {
            if let Ok(parsed) = directive.parse() {
                filter = filter.add_directive(parsed);
            }
        }
        filter
    }

    /// Installs the subscriber, ignoring failure when one is already set.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, failing when one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();

        // Display toggles shared by the text formats.
        macro_rules! decorate {
            ($layer:expr) => {
                $layer
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids)
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
            };
        }

        // The writer decides the concrete layer type, so the format match
        // expands once per writer.
        macro_rules! install {
            ($writer:expr) => {{
                let registry = tracing_subscriber::registry().with(filter);
                match &self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => registry
                        .with(fmt::layer().json().with_writer($writer))
                        .try_init(),
                    #[cfg(not(feature = "json-log"))]
                    LogFormat::Json => {
                        let installed = registry
                            .with(decorate!(fmt::layer().compact()).with_writer($writer))
                            .try_init();
                        warn!("JSON logging needs the json-log feature, emitting compact text");
                        installed
                    }
                    LogFormat::Compact => registry
                        .with(decorate!(fmt::layer().compact()).with_writer($writer))
                        .try_init(),
                    LogFormat::Full => registry
                        .with(decorate!(fmt::layer()).with_writer($writer))
                        .try_init(),
                    LogFormat::Pretty => registry
                        .with(decorate!(fmt::layer().pretty()).with_writer($writer))
                        .try_init(),
                }
            }};
        }

        match &self.output {
            LogOutput::Stdout => install!(std::io::stdout),
            LogOutput::Stderr => install!(std::io::stderr),
            LogOutput::File => match self.file_path {
                Some(ref path) => {
                    let appender = tracing_appender::rolling::never(
                        path.parent().unwrap_or_else(|| Path::new(".")),
                        path.file_name().unwrap_or_else(|| OsStr::new("solder.log")),
                    );
                    install!(appender)
                }
                None => {
                    let installed = install!(std::io::stdout);
                    warn!("File output selected without logging.file_path, writing to stdout");
                    installed
                }
            },
        }
    }
}
