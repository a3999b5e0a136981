//! Persistent key-value store seam

use relup_errors::StorageError;

/// Small durable preference store.
///
/// Calls are synchronous so callers can persist a value in the same critical
/// section that updates their in-memory copy.
pub trait KeyValueStore: Send + Sync {
    /// Read an integer, returning `default` when the key is absent
    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StorageError>;

    fn put_i64(&self, key: &str, value: i64) -> Result<(), StorageError>;

    /// Remove the key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
