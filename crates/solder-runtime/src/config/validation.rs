//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchSettings, LogOutput, LoggingConfig, SolderConfig};

/// Validates a loaded configuration before the runtime uses it.
pub fn validate_config(config: &SolderConfig) -> ConfigResult<()> {
    validate_dispatch(&config.dispatch)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_dispatch(dispatch: &DispatchSettings) -> ConfigResult<()> {
    if dispatch.rate_burst == 0 {
        return Err(ConfigError::validation("dispatch.rate_burst must be at least 1"));
    }
    if !dispatch.rate_per_sec.is_finite() || dispatch.rate_per_sec <= 0.0 {
        return Err(ConfigError::validation(format!(
            "dispatch.rate_per_sec must be a positive number, got {}",
            dispatch.rate_per_sec
        )));
    }
    if dispatch.workers == 0 {
        return Err(ConfigError::validation("dispatch.workers must be at least 1"));
    }
    if dispatch.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "dispatch.queue_capacity must be at least 1",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if logging.filters.keys().any(|target| target.is_empty()) {
        return Err(ConfigError::validation(
            "logging.filters targets must be non-empty",
        ));
    }
    #[cfg(not(feature = "json-log"))]
    if logging.format == super::schema::LogFormat::Json {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the json-log feature",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SolderConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_burst() {
        let mut config = SolderConfig::default();
        config.dispatch.rate_burst = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut config = SolderConfig::default();
        config.dispatch.rate_per_sec = 0.0;
        assert!(validate_config(&config).is_err());

        config.dispatch.rate_per_sec = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = SolderConfig::default();
        config.dispatch.workers = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_queue_capacity() {
        let mut config = SolderConfig::default();
        config.dispatch.queue_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_empty_filter_target() {
        let mut config = SolderConfig::default();
        config
            .logging
            .filters
            .insert(String::new(), crate::config::LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn file_output_requires_path() {
        let mut config = SolderConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("solder.log"));
        assert!(validate_config(&config).is_ok());
    }
}
