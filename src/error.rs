//! Error types for the device registry

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the device registry
///
/// Lookup misses and duplicate inserts are not errors; they are reported
/// through outcome values on the registry itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database setup or migration error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Durable snapshot store unavailable or failed
    #[error("snapshot store error: {0}")]
    Store(String),

    /// Snapshot text decoded but breaks registry invariants
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}
