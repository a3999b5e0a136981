//! Consumer-facing download callbacks

use chrono::{DateTime, Utc};
use relup_errors::DownloadError;
use relup_types::LocalArtifact;

/// Receives the progress of one release download.
///
/// Callbacks run on a runtime worker while the downloader's lock is held, so
/// they must not block. They may call back into the downloader (for example
/// `cancel()` from `on_progress`). For one attempt `on_start` comes first and
/// at most one of `on_complete` / `on_error` follows.
pub trait ReleaseListener: Send + Sync {
    /// The download service accepted the request
    fn on_start(&self, enqueued_at: DateTime<Utc>);

    /// Progress snapshot. Return true to keep polling, false to stop.
    fn on_progress(&self, bytes_so_far: u64, bytes_total: Option<u64>) -> bool;

    /// The artifact is downloaded and its size matches the release
    fn on_complete(&self, artifact: LocalArtifact);

    /// The attempt failed; nothing is retried automatically
    fn on_error(&self, error: DownloadError);
}
