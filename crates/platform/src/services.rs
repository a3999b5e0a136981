//! Collaborator bundle handed to the updater

use std::sync::Arc;

use crate::download::DownloadService;
use crate::installer::InstallerService;
use crate::source::InstallSourceProbe;
use crate::storage::KeyValueStore;

/// Every external collaborator an update needs, behind its trait
#[derive(Clone)]
pub struct Platform {
    downloads: Arc<dyn DownloadService>,
    installer: Arc<dyn InstallerService>,
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn InstallSourceProbe>,
}

impl Platform {
    /// Create a platform from the given implementations
    pub fn new(
        downloads: Arc<dyn DownloadService>,
        installer: Arc<dyn InstallerService>,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn InstallSourceProbe>,
    ) -> Self {
        Self {
            downloads,
            installer,
            store,
            source,
        }
    }

    /// Access the download service
    pub fn downloads(&self) -> Arc<dyn DownloadService> {
        Arc::clone(&self.downloads)
    }

    /// Access the installer service
    pub fn installer(&self) -> Arc<dyn InstallerService> {
        Arc::clone(&self.installer)
    }

    /// Access the key-value store
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    /// Access the install-source probe
    pub fn source(&self) -> Arc<dyn InstallSourceProbe> {
        Arc::clone(&self.source)
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
