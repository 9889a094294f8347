//! Configuration management for the device registry

pub mod file;

use std::path::PathBuf;

use crate::{Error, Result};

use self::file::DevregConfigFile;

/// Default database file name inside the data directory
const DATABASE_FILE: &str = "registry.db";

/// Default log filter
const DEFAULT_LOG_FILTER: &str = "info,device_registry=info";

/// Registry configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (`~/.local/share/devreg` on Linux)
    pub data_dir: PathBuf,

    /// `SQLite` file holding the snapshot
    pub database_path: PathBuf,

    /// `tracing` filter used at default verbosity
    pub log_filter: String,
}

impl Config {
    /// Load configuration (env > toml > default) and create the data directory
    ///
    /// # Errors
    ///
    /// Returns error if a setting is invalid or the data directory cannot be created
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        let config = Self::from_sources(fc, |key| std::env::var(key).ok())?;

        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    /// Resolve settings from a config file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a setting is present but empty
    pub fn from_sources(
        fc: DevregConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let data_dir = non_empty("DEVREG_DATA_DIR", env("DEVREG_DATA_DIR"))?
            .or(fc.storage.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let database_path = non_empty("DEVREG_DATABASE", env("DEVREG_DATABASE"))?
            .or(fc.storage.database_path)
            .map_or_else(|| data_dir.join(DATABASE_FILE), PathBuf::from);

        let log_filter = non_empty("DEVREG_LOG", env("DEVREG_LOG"))?
            .or(fc.logging.filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            database_path,
            log_filter,
        })
    }
}

fn non_empty(name: &str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(Error::Config(format!("{name} is set but empty"))),
        other => Ok(other),
    }
}

/// Default data directory: `~/.local/share/devreg` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".devreg"), |d| d.data_dir().join("devreg"))
}
