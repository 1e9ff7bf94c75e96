//! SQLite store backend for persistent storage.

use super::FingerprintStore;
use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed fingerprint store
///
/// Each namespace is one table of `key TEXT PRIMARY KEY, value BLOB`.
/// Uses WAL mode; `sync_all` checkpoints the WAL into the main database file.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    db_path: PathBuf,
    namespace: String,
}

impl SqliteStore {
    /// Open or create a store database at `path` and initialize `namespace`
    pub fn open(path: &Path, namespace: &str) -> Result<Self, StoreError> {
        if !is_valid_namespace(namespace) {
            return Err(StoreError::InvalidNamespace {
                name: namespace.to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{namespace}\" (
                    key TEXT PRIMARY KEY,
                    value BLOB NOT NULL
                )"
            ),
            [],
        )
        .map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path: path.to_path_buf(),
            namespace: namespace.to_string(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn checkpoint(conn: &Connection) -> Result<(), StoreError> {
        // Returns (busy, log frames, checkpointed frames)
        let busy: i64 = conn
            .query_row("PRAGMA wal_checkpoint(FULL)", [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        if busy != 0 {
            return Err(StoreError::QueryFailed(
                "WAL checkpoint could not complete".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_valid_namespace(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FingerprintStore for SqliteStore {
    fn has(&self, key: &str) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE key = ?)",
                self.namespace
            ),
            [key],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.query_row(
            &format!("SELECT value FROM \"{}\" WHERE key = ?", self.namespace),
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO \"{}\" (key, value) VALUES (?, ?)",
                self.namespace
            ),
            params![key, value],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut stmt = conn
            .prepare(&format!("SELECT key FROM \"{}\"", self.namespace))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let keys = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(keys)
    }

    fn sync_all(&self) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        Self::checkpoint(conn)
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let conn = guard.take().ok_or(StoreError::Closed)?;

        Self::checkpoint(&conn)?;
        conn.close()
            .map_err(|(_, e)| StoreError::QueryFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp(temp_dir: &TempDir) -> SqliteStore {
        SqliteStore::open(&temp_dir.path().join("db").join("store.db"), "images").unwrap()
    }

    #[test]
    fn sqlite_store_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp(&temp_dir);

        assert!(store.path().exists());
        assert_eq!(store.namespace(), "images");
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn sqlite_store_stores_and_retrieves() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp(&temp_dir);

        store.put("/a.png", b"record-a").unwrap();

        assert!(store.has("/a.png").unwrap());
        assert!(!store.has("/b.png").unwrap());
        assert_eq!(store.get("/a.png").unwrap(), Some(b"record-a".to_vec()));
        assert_eq!(store.get("/b.png").unwrap(), None);
    }

    #[test]
    fn sqlite_put_replaces_whole_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp(&temp_dir);

        store.put("/a.png", b"first version").unwrap();
        store.put("/a.png", b"v2").unwrap();

        assert_eq!(store.get("/a.png").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.keys().unwrap(), vec!["/a.png".to_string()]);
    }

    #[test]
    fn sqlite_store_persists_across_opens() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = open_temp(&temp_dir);
            store.put("/a.png", b"record-a").unwrap();
            store.put("/b.png", b"record-b").unwrap();
            store.close().unwrap();
        }

        let store = open_temp(&temp_dir);
        let mut keys = store.keys().unwrap();
        keys.sort();

        assert_eq!(keys, vec!["/a.png".to_string(), "/b.png".to_string()]);
    }

    #[test]
    fn sqlite_store_rejects_use_after_close() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp(&temp_dir);

        store.sync_all().unwrap();
        store.close().unwrap();

        assert!(matches!(store.get("/a.png"), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn sqlite_store_rejects_bad_namespace() {
        let temp_dir = TempDir::new().unwrap();
        let result = SqliteStore::open(&temp_dir.path().join("store.db"), "images\"; DROP");

        assert!(matches!(result, Err(StoreError::InvalidNamespace { .. })));
    }
}
