//! Configuration management module for the watcher daemon.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
//!
//! Watcher sections (`[watchers.apperr]`, `[watchers.liveness]`) are not
//! validated here. Each watcher checks its own section when it starts running
//! and disables itself on a bad value, so one misconfigured watcher never keeps
//! the daemon or its siblings from starting.
mod directory;
mod log;
mod monitoring;
mod watchers;
pub use directory::*;
pub use log::*;
pub use monitoring::*;
pub use watchers::*;
use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Prefix of environment variables overriding configuration values,
/// e.g. `KGUARD__WATCHERS__APPERR__CLUSTER`.
pub const ENV_PREFIX: &str = "KGUARD";

/// Main configuration container for the watcher daemon
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Prometheus scrape endpoint
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Log output
    #[serde(default)]
    pub log: LogConfig,
    /// Enabled watchers and their sections
    #[serde(default)]
    pub watchers: WatchersConfig,
    /// Static cluster directory used by the bundled daemon wiring
    #[serde(default)]
    pub directory: DirectoryConfig,
}
impl Debug for Settings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("monitoring", &self.monitoring)
            .field("watchers", &self.watchers.enabled)
            .finish()
    }
}
impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `KGUARD__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/kguard.toml");
    /// std::env::set_var("KGUARD__WATCHERS__APPERR__TOPIC", "applog");
    /// let settings = Settings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings) // No validation - deferred to validate()
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates daemon-level sections and returns the validated instance.
    ///
    /// # Errors
    /// - Invalid or privileged Prometheus port
    /// - Unparseable log level
    /// - Empty watcher list
    pub fn validate(self) -> Result<Self> {
        self.monitoring.validate()?;
        self.log.validate()?;
        self.watchers.validate()?;
        self.directory.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("watchers.enabled")
}
