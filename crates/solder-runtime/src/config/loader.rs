//! Layered configuration for the dispatch runtime, built on figment.
//!
//! A [`ConfigLoader`] folds up to four kinds of sources into one
//! [`SolderConfig`], later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`SolderConfig::default`])
//! 2. programmatic overrides given to [`merge`](ConfigLoader::merge)
//! 3. configuration files: a profile variant (`solder.development.toml`)
//!    first, then the base file (`solder.toml`), so base-file keys win
//! 4. `SOLDER_` environment variables, which override everything
//!
//! # File discovery
//!
//! Unless [`file`](ConfigLoader::file) pins an exact path, the loader walks
//! its search directories (the working directory and the per-user config
//! directory when none are given) trying well-known names for every
//! enabled format, and stops at the first base file it finds.
//!
//! # Feature flags
//!
//! File formats are compile-time features: `toml-config` reads
//! `solder.toml` and `config.toml`, `yaml-config` reads `solder.yaml`,
//! `solder.yml`, `config.yaml` and `config.yml`. With neither enabled the
//! remaining layers still apply.
//!
//! # Environment variables
//!
//! Variables prefixed with `SOLDER_` map onto the schema, `__` separating
//! nesting levels:
//!
//! ```text
//! SOLDER_DISPATCH__WORKERS=64     -> dispatch.workers = 64
//! SOLDER_DISPATCH__RATE_BURST=5   -> dispatch.rate_burst = 5
//! SOLDER_LOGGING__LEVEL=debug     -> logging.level = "debug"
//! SOLDER_PROFILE=production       -> selects the production profile
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/solder")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SolderConfig;
use super::validation::validate_config;

/// Deployment profile, selecting which profile-specific configuration
/// files the loader looks for.
///
/// Resolved from `SOLDER_PROFILE` unless set explicitly; unrecognized
/// labels become [`Profile::Custom`].
#[derive(Debug, Clone, Default)]
pub enum Profile {
    #[default]
    Development,
    Production,
    /// Any other label, normalized to lowercase.
    Custom(String),
}

impl Profile {
    /// The name used in profile-specific file names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads the profile from `SOLDER_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("SOLDER_PROFILE")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    /// Parses a profile label. Unknown labels become custom profiles,
    /// lowercased so the file names they select stay predictable.
    fn parse(label: &str) -> Self {
        let normalized = label.to_lowercase();
        match normalized.as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            _ => Self::Custom(normalized),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assembles a [`SolderConfig`] from the layered sources described at the
/// module level.
///
/// Builder calls only record intent; no configuration source is read
/// before [`load`](ConfigLoader::load).
pub struct ConfigLoader {
    /// Programmatic layers accumulated through [`merge`](ConfigLoader::merge).
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Pinned file; set, it disables discovery entirely.
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Selects the profile by name, accepting the short forms `dev` and
    /// `prod` as well as custom labels.
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Profile::parse(&name.into());
        self
    }

    /// Appends a directory to the discovery search list.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Appends the process working directory to the search list.
    pub fn with_current_dir(mut self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_paths.push(cwd);
        }
        self
    }

    /// Appends the per-user config directory (`<config>/solder`) to the
    /// search list.
    pub fn with_user_config_dir(mut self) -> Self {
        if let Some(base) = dirs::config_dir() {
            self.search_paths.push(base.join("solder"));
        }
        self
    }

    /// Pins one exact configuration file instead of discovering any.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Re-enables the environment layer (on by default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Skips the `SOLDER_` environment layer.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers settings over the built-in defaults.
    ///
    /// Merged values are a base for this process: configuration files and
    /// `SOLDER_` environment variables still override them.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut tuning = SolderConfig::default();
    /// tuning.dispatch.rate_burst = 10;
    ///
    /// let config = ConfigLoader::new().merge(tuning).load()?;
    /// ```
    pub fn merge(mut self, config: SolderConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Resolves and validates the configuration, consuming the loader.
    pub fn load(self) -> ConfigResult<SolderConfig> {
        let profile = self.profile.clone();
        let figment = self.assemble()?;

        let config: SolderConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(format!("Invalid configuration: {e}")))?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            level = %config.logging.level,
            workers = config.dispatch.workers,
            "Configuration resolved"
        );

        Ok(config)
    }

    /// Folds every configured source into one figment, in priority order.
    fn assemble(self) -> ConfigResult<Figment> {
        let Self {
            overrides,
            profile,
            search_paths,
            load_env,
            config_file,
        } = self;

        let mut figment =
            Figment::from(Serialized::defaults(SolderConfig::default())).merge(overrides);

        figment = match config_file {
            Some(path) => read_file(figment, &path)?,
            None => discover(figment, &search_dirs(search_paths), &profile),
        };

        if load_env {
            trace!("Applying SOLDER_ environment overrides");
            figment = figment.merge(Env::prefixed("SOLDER_").split("__"));
        }

        Ok(figment)
    }
}

/// Resolves configuration from the default search locations.
pub fn load_config() -> ConfigResult<SolderConfig> {
    ConfigLoader::new().load()
}

/// Resolves configuration from one pinned file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SolderConfig> {
    ConfigLoader::new().file(path).load()
}

/// A file format the loader can ingest. Variants exist only for formats
/// enabled at compile time.
#[derive(Debug, Clone, Copy)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    fn enabled() -> Vec<FileFormat> {
        let mut formats = Vec::new();
        #[cfg(feature = "toml-config")]
        formats.push(FileFormat::Toml);
        #[cfg(feature = "yaml-config")]
        formats.push(FileFormat::Yaml);
        formats
    }

    fn for_extension(ext: &str) -> Option<FileFormat> {
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Some(FileFormat::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    /// Well-known file names tried during discovery, most specific first.
    fn well_known(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => &["solder.toml", "config.toml"],
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => &["solder.yaml", "solder.yml", "config.yaml", "config.yml"],
        }
    }

    fn read(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Merges one pinned file, failing when it is absent or its extension is
/// not an enabled format.
fn read_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match FileFormat::for_extension(ext) {
        Some(format) => {
            info!(path = %path.display(), "Reading configuration file");
            Ok(format.read(figment, path))
        }
        None => Err(ConfigError::ParseError(format!(
            "Unrecognized or disabled configuration format: {}",
            path.display()
        ))),
    }
}

/// Explicit search paths win; otherwise the working directory and the
/// per-user config directory are searched.
fn search_dirs(explicit: Vec<PathBuf>) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit;
    }
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(base) = dirs::config_dir() {
        roots.push(base.join("solder"));
    }
    roots
}

/// Walks the search directories once per enabled format.
fn discover(mut figment: Figment, roots: &[PathBuf], profile: &Profile) -> Figment {
    let mut found = false;
    for format in FileFormat::enabled() {
        let (merged, hit) = scan(figment, roots, profile, format);
        figment = merged;
        found |= hit;
    }
    if !found {
        warn!("No configuration file found, running on built-in defaults");
    }
    figment
}

/// Tries one format's well-known names under each root, stopping at the
/// first base file. A profile variant sitting next to a matched name is
/// merged before it, as the lower layer.
fn scan(
    mut figment: Figment,
    roots: &[PathBuf],
    profile: &Profile,
    format: FileFormat,
) -> (Figment, bool) {
    for root in roots {
        for name in format.well_known() {
            let Some((stem, ext)) = name.rsplit_once('.') else {
                continue;
            };

            let variant = root.join(format!("{stem}.{profile}.{ext}"));
            if variant.exists() {
                debug!(path = %variant.display(), "Merging profile configuration");
                figment = format.read(figment, &variant);
            }

            let base = root.join(name);
            if base.exists() {
                info!(path = %base.display(), "Reading configuration file");
                return (format.read(figment, &base), true);
            }
        }
    }
    (figment, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DispatchSettings;

    #[test]
    fn bare_loader_yields_defaults() {
        let config = ConfigLoader::new().without_env().load().unwrap();

        assert_eq!(config.dispatch.rate_burst, 3);
        assert_eq!(config.dispatch.workers, 32);
        assert_eq!(config.logging.level.as_str(), "info");
    }

    #[test]
    fn merged_settings_layer_over_defaults() {
        let tuned = SolderConfig {
            dispatch: DispatchSettings {
                rate_burst: 9,
                ..Default::default()
            },
            ..Default::default()
        };

        let config = ConfigLoader::new()
            .without_env()
            .merge(tuned)
            .load()
            .unwrap();

        assert_eq!(config.dispatch.rate_burst, 9);
        // Fields the merge did not touch keep their defaults.
        assert_eq!(config.dispatch.workers, 32);
    }

    #[test]
    fn environment_overrides_merged_settings() {
        let mut tuned = SolderConfig::default();
        tuned.dispatch.queue_capacity = 256;

        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("SOLDER_DISPATCH__QUEUE_CAPACITY", "64") };
        let config = ConfigLoader::new().merge(tuned).load().unwrap();
        unsafe { std::env::remove_var("SOLDER_DISPATCH__QUEUE_CAPACITY") };

        assert_eq!(config.dispatch.queue_capacity, 64);
    }

    #[test]
    fn out_of_range_values_fail_at_load() {
        let broken = SolderConfig {
            dispatch: DispatchSettings {
                workers: 0,
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = ConfigLoader::new().without_env().merge(broken).load();
        assert!(matches!(outcome, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn pinned_file_must_exist() {
        let outcome = load_config_from_file("nowhere/solder.toml");
        assert!(matches!(outcome, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn profile_comes_from_environment() {
        // SAFETY: set and removed around a single read; concurrent readers
        // of this key only vary which optional file names get tried.
        unsafe { std::env::set_var("SOLDER_PROFILE", "prod") };
        let profile = Profile::from_env();
        unsafe { std::env::remove_var("SOLDER_PROFILE") };

        assert!(matches!(profile, Profile::Production));
    }

    #[test]
    fn custom_profiles_normalize_to_lowercase() {
        let loader = ConfigLoader::new().profile("QA");
        assert_eq!(loader.profile.as_str(), "qa");
        assert_eq!(Profile::parse("Staging").as_str(), "staging");
    }
}
