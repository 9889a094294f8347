//! Durable key-value storage for registry snapshots

mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{Error, Result};

pub use sqlite::SqliteStore;

/// Text key-value store the registry persists snapshots into
///
/// Implementations report unavailability as [`Error::Store`] rather than
/// pretending the key is absent.
pub trait SnapshotStore {
    /// Write `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`, or `None` if it was never written
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}
