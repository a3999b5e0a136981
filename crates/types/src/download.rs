//! Download identifiers and status snapshots

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identifier handed out by a download service.
///
/// `DownloadId::INVALID` is the persisted sentinel for "no active download";
/// in memory the absence of a download is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(i64);

impl DownloadId {
    /// Sentinel stored when no download is active
    pub const INVALID: i64 = -1;

    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Interpret a persisted value, mapping the sentinel to `None`
    #[must_use]
    pub fn from_persisted(raw: i64) -> Option<Self> {
        (raw != Self::INVALID).then_some(Self(raw))
    }

    /// Raw value as stored in the key-value store
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase reported by the download service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DownloadPhase {
    /// Accepted but no bytes transferred yet
    Pending,
    /// Transfer in progress
    Running,
    /// Transfer finished and the artifact is available locally
    Succeeded,
    /// Transfer aborted by the service
    Failed { reason: String },
}

impl DownloadPhase {
    /// Returns true for `Succeeded` and `Failed`
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Snapshot produced by a single status query. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStatus {
    /// Total size if the service knows it yet
    pub bytes_total: Option<u64>,
    pub bytes_so_far: u64,
    pub phase: DownloadPhase,
}

impl DownloadStatus {
    #[must_use]
    pub fn pending() -> Self {
        Self {
            bytes_total: None,
            bytes_so_far: 0,
            phase: DownloadPhase::Pending,
        }
    }

    #[must_use]
    pub fn running(bytes_so_far: u64, bytes_total: Option<u64>) -> Self {
        Self {
            bytes_total,
            bytes_so_far,
            phase: DownloadPhase::Running,
        }
    }

    #[must_use]
    pub fn succeeded(size: u64) -> Self {
        Self {
            bytes_total: Some(size),
            bytes_so_far: size,
            phase: DownloadPhase::Succeeded,
        }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            bytes_total: None,
            bytes_so_far: 0,
            phase: DownloadPhase::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Get progress percentage (0-100) if the total is known
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> Option<f64> {
        self.bytes_total.map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.bytes_so_far as f64 / total as f64) * 100.0
            }
        })
    }
}

/// Local reference to a completed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtifact {
    pub path: PathBuf,
    /// Size on disk as reported by the download service
    pub size: u64,
}
