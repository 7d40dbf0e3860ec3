//! Configuration management for Archivo

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main configuration for Archivo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// First existing file among [`Config::config_locations`]
    pub fn find() -> Option<PathBuf> {
        Self::config_locations().into_iter().find(|path| path.exists())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get default configuration file locations
    pub fn config_locations() -> Vec<PathBuf> {
        let mut locations = Vec::new();

        // 1. Current directory
        locations.push(PathBuf::from(".archivo.toml"));

        // 2. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("archivo").join("config.toml"));
        }

        // 3. Home directory
        if let Some(home) = dirs::home_dir() {
            locations.push(home.join(".archivo.toml"));
        }

        locations
    }

    /// Get the data directory for storing the archive
    pub fn data_dir() -> Result<PathBuf> {
        if let Some(data_dir) = dirs::data_local_dir() {
            let path = data_dir.join("archivo");
            std::fs::create_dir_all(&path)?;
            Ok(path)
        } else {
            Err(Error::Config("Could not determine data directory".into()))
        }
    }

    /// Path of the SQLite archive: the configured override, else the data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("archive.db")),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}': must be one of {:?}",
                self.logging.level, valid_log_levels
            )));
        }

        if self.storage.max_connections == 0 {
            return Err(Error::Config(
                "Invalid max_connections 0: must be at least 1".into(),
            ));
        }

        if let Some(min_idle) = self.storage.min_idle {
            if min_idle > self.storage.max_connections {
                return Err(Error::Config(format!(
                    "Invalid min_idle {}: must not exceed max_connections ({})",
                    min_idle, self.storage.max_connections
                )));
            }
        }

        if self.storage.connection_timeout_secs == 0 {
            return Err(Error::Config(
                "Invalid connection_timeout_secs 0: must be at least 1".into(),
            ));
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Storage path must not be empty".into()));
            }
        }

        Ok(())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Archive file location (defaults to the user data directory)
    pub path: Option<PathBuf>,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Idle connections kept open
    pub min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection
    pub connection_timeout_secs: u64,
    /// Milliseconds SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 10,
            min_idle: Some(2),
            connection_timeout_secs: 30,
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
