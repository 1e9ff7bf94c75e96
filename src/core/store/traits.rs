//! Fingerprint store trait definition.

use crate::error::StoreError;

/// Key-value persistence for serialized fingerprint records.
///
/// Implementations must allow concurrent `has`/`get`/`put` from many
/// ingestion workers.
pub trait FingerprintStore: Send + Sync {
    /// Check whether a value exists under `key`
    fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Get the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or replace the value under `key`
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Every key in the namespace, in no particular order
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Flush everything written so far to durable storage
    fn sync_all(&self) -> Result<(), StoreError>;

    /// Flush and release the backend. Later calls fail with `StoreError::Closed`.
    fn close(&self) -> Result<(), StoreError>;
}
