//! TOML configuration file loading
//!
//! Supports `~/.config/devreg/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DevregConfigFile {
    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingFileConfig,
}

/// Storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Directory for the database and other state
    pub data_dir: Option<String>,

    /// Explicit database file, overriding `data_dir`
    pub database_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Default, Deserialize)]
pub struct LoggingFileConfig {
    /// `tracing` filter directive used when no `-v` flag is given
    pub filter: Option<String>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the text is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<DevregConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `DevregConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> DevregConfigFile {
    let Some(path) = config_file_path() else {
        return DevregConfigFile::default();
    };

    if !path.exists() {
        return DevregConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                DevregConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            DevregConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/devreg/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("devreg").join("config.toml"))
}
