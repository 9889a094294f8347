//! `SQLite`-backed snapshot storage

use super::SnapshotStore;
use crate::db::DbPool;
use crate::{Error, Result};

/// Snapshot store persisted in the local database
#[derive(Clone)]
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    /// Create a store backed by the given pool
    #[must_use]
    pub const fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl SnapshotStore for SqliteStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.get().map_err(|e| Error::Store(e.to_string()))?;
        conn.execute(
            "INSERT INTO snapshots (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![key, value],
        )
        .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.get().map_err(|e| Error::Store(e.to_string()))?;
        let result = conn.query_row(
            "SELECT value FROM snapshots WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> DbPool {
        crate::db::init_memory().unwrap()
    }

    #[test]
    fn set_and_get() {
        let store = SqliteStore::new(test_db());
        store.set("Device_Data", "[]").unwrap();
        assert_eq!(store.get("Device_Data").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn set_replaces_previous_value() {
        let store = SqliteStore::new(test_db());
        store.set("Device_Data", "[1]").unwrap();
        store.set("Device_Data", "[2]").unwrap();
        assert_eq!(store.get("Device_Data").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn missing_key_is_none() {
        let store = SqliteStore::new(test_db());
        assert!(store.get("Device_Data").unwrap().is_none());
    }

    #[test]
    fn broken_table_is_an_error() {
        let db = test_db();
        db.get().unwrap().execute_batch("DROP TABLE snapshots").unwrap();

        let store = SqliteStore::new(db);
        assert!(matches!(store.set("k", "v"), Err(Error::Store(_))));
        assert!(matches!(store.get("k"), Err(Error::Store(_))));
    }
}
