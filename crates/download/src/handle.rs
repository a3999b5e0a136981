//! Durable slot holding the active download identifier

use relup_config::constants::DOWNLOAD_ID_KEY;
use relup_errors::StorageError;
use relup_platform::KeyValueStore;
use relup_types::DownloadId;
use std::sync::Arc;

/// Persists the current [`DownloadId`] so monitoring can resume after a restart.
///
/// Absence is stored as the [`DownloadId::INVALID`] sentinel or a missing key.
#[derive(Clone)]
pub struct DownloadHandleStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl DownloadHandleStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DOWNLOAD_ID_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Identifier recovered from the store, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(&self) -> Result<Option<DownloadId>, StorageError> {
        let raw = self.store.get_i64(&self.key, DownloadId::INVALID)?;
        Ok(DownloadId::from_persisted(raw))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save(&self, id: DownloadId) -> Result<(), StorageError> {
        self.store.put_i64(&self.key, id.get())
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key)
    }
}

impl std::fmt::Debug for DownloadHandleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandleStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
