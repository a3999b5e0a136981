//! Reports returned by operations

use relup_events::FailureContext;
use relup_types::{
    ConfirmationIntent, DownloadPhase, DownloadStatus, TerminalState, UpdatePhase,
};
use serde::Serialize;

/// State of the download recorded in the store
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DownloadReport {
    /// Persisted download id, if any
    pub id: Option<i64>,
    /// What the download service reports for it; `None` if it forgot the id
    pub status: Option<DownloadStatus>,
}

impl DownloadReport {
    /// Report for a store without an active download
    #[must_use]
    pub fn idle() -> Self {
        Self {
            id: None,
            status: None,
        }
    }

    /// Whether the recorded download finished transferring
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.phase == DownloadPhase::Succeeded)
    }
}

/// Outcome of one update attempt
#[derive(Clone, Debug, Serialize)]
pub struct UpdateReport {
    /// Version of the release
    pub version: String,
    /// Phase the attempt ended in (or is in)
    pub phase: UpdatePhase,
    /// Installer session committed for the release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u32>,
    /// Pending confirmation prompt, if the installer asked for one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationIntent>,
    /// Failure shown to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureContext>,
    /// The host replaced the application and asked for a relaunch
    pub relaunch_requested: bool,
}

impl UpdateReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.phase == UpdatePhase::Terminal(TerminalState::Succeeded)
    }
}
