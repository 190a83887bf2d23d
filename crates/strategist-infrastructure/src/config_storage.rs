//! Application configuration file storage (config.toml).

use std::path::PathBuf;

use strategist_core::StrategistError;
use strategist_core::config::AppConfig;

use crate::paths::StrategistPaths;

/// Loads `AppConfig` from config.toml in the config directory.
///
/// A missing file yields the default configuration; a malformed file is an
/// error so typos don't silently fall back to defaults.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a ConfigStorage with the default path.
    pub fn new() -> Result<Self, StrategistError> {
        let path = StrategistPaths::config_file()
            .map_err(|e| StrategistError::config(e.to_string()))?;
        Ok(Self { path })
    }

    /// Creates a ConfigStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the configuration, defaulting when the file does not exist.
    pub fn load(&self) -> Result<AppConfig, StrategistError> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let text = std::fs::read_to_string(&self.path)?;
        let config: AppConfig = toml::from_str(&text)?;
        Ok(config)
    }
}
