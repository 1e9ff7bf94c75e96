//! # Store Module
//!
//! Durable persistence of fingerprint records, keyed by absolute file path.
//!
//! ## Backends
//! - `SqliteStore` - Persistent storage using SQLite
//! - `InMemoryStore` - For testing
//!
//! ## Layout
//! One store per user, rooted at `<data_dir>/dupehunter/db`, with a single
//! namespace (`images`) mapping path → JSON-encoded `FingerprintRecord`.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::FingerprintStore;

use crate::core::record::{FileStat, FingerprintRecord};
use crate::error::StoreError;
use std::path::{Path, PathBuf};

/// Namespace holding image fingerprint records
pub const IMAGES_NAMESPACE: &str = "images";

/// File name of the database inside the store directory
pub const DATABASE_FILE: &str = "fingerprints.db";

/// Default per-user store directory
pub fn default_store_dir() -> Result<PathBuf, StoreError> {
    dirs::data_dir()
        .map(|dir| dir.join("dupehunter").join("db"))
        .ok_or(StoreError::NoDataDirectory)
}

/// Open the store in `dir`, creating and initializing it if absent
pub fn open_store(dir: &Path) -> Result<SqliteStore, StoreError> {
    match std::fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(StoreError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        Ok(_) => {
            tracing::trace!(path = %dir.display(), "opening database");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %dir.display(), "creating new database");
            create_store_dir(dir)?;
        }
        Err(e) => {
            return Err(StoreError::CreateDirectory {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    }

    SqliteStore::open(&dir.join(DATABASE_FILE), IMAGES_NAMESPACE)
}

fn create_store_dir(dir: &Path) -> Result<(), StoreError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder
        .create(dir)
        .map_err(|e| StoreError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;

    if !dir.is_dir() {
        return Err(StoreError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Check whether `stat` describes a file already ingested and unchanged.
///
/// Read and deserialization errors count as "already present": a skipped
/// stale entry is preferred over repeated work. They are logged.
pub fn check_existing(stat: &FileStat, store: &dyn FingerprintStore) -> bool {
    let key = stat.key();

    match store.has(&key) {
        Ok(false) => return false,
        Ok(true) => {}
        Err(e) => {
            tracing::error!(path = %stat.path.display(), error = %e, "database error");
            return true;
        }
    }

    let existing = match store.get(&key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return false,
        Err(e) => {
            tracing::error!(path = %stat.path.display(), error = %e, "database error");
            return true;
        }
    };

    match FingerprintRecord::from_slice(&existing) {
        Ok(recall) => recall.is_unchanged(stat.size, stat.mod_time),
        Err(e) => {
            tracing::error!(path = %stat.path.display(), error = %e, "unmarshal error");
            true
        }
    }
}
