//! Download service seam

use async_trait::async_trait;
use relup_errors::PlatformError;
use relup_types::{DownloadId, DownloadStatus, LocalArtifact};

/// Background download service tracking transfers by opaque identifier
#[async_trait]
pub trait DownloadService: Send + Sync {
    /// Submit a request for `url`, returning the identifier the service assigned
    async fn submit(&self, url: &str) -> Result<DownloadId, PlatformError>;

    /// Current status of `id`, `None` if the service does not know it
    async fn query(&self, id: DownloadId) -> Result<Option<DownloadStatus>, PlatformError>;

    /// Whether `id` exists and is still in the pending phase
    async fn is_pending(&self, id: DownloadId) -> Result<bool, PlatformError>;

    /// Remove the download and any partial or completed file
    async fn remove(&self, id: DownloadId) -> Result<(), PlatformError>;

    /// Resolve the local artifact of a completed download, `None` if no file exists
    async fn open_completed(&self, id: DownloadId) -> Result<Option<LocalArtifact>, PlatformError>;
}
