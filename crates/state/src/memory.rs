//! Volatile store for tests and ephemeral runs

use parking_lot::Mutex;
use relup_errors::StorageError;
use relup_platform::KeyValueStore;
use std::collections::HashMap;

/// Store that keeps values in memory only
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `key`, bypassing the default
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<i64> {
        self.values.lock().get(key).copied()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StorageError> {
        Ok(self.peek(key).unwrap_or(default))
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}
