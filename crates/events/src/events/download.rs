use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Download-stage events for the event system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Request submitted to the download service
    Requested { url: String, version: String },

    /// Request accepted and identifier persisted
    Started {
        id: i64,
        url: String,
        enqueued_at: DateTime<Utc>,
    },

    /// Monitoring picked up a download recovered from a previous run
    Resumed { id: i64 },

    /// Progress observed by the monitor
    Progress {
        id: i64,
        bytes_so_far: u64,
        bytes_total: Option<u64>,
    },

    /// Artifact downloaded and size-checked
    Completed { id: i64, path: PathBuf, size: u64 },

    /// Terminal download failure
    Failed {
        id: Option<i64>,
        failure: FailureContext,
    },

    /// Download removed from the service and the persisted handle cleared
    Removed { id: i64 },
}
