use relup_types::ConfirmationIntent;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Installer-stage events, including the notices surfaced to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// Installer session opened for the artifact
    SessionOpened { session: u32, path: String },

    /// Artifact bytes streamed into the session
    Streamed { session: u32, bytes: u64 },

    /// Session committed; the outcome arrives asynchronously
    Committed { session: u32 },

    /// The installer needs the user to confirm; surface this prompt
    ConfirmationRequired { intent: ConfirmationIntent },

    /// Installer reported success
    Succeeded { session: Option<u32> },

    /// Generic "something went wrong" notice for the user
    Failed {
        session: Option<u32>,
        code: Option<i32>,
        failure: FailureContext,
    },

    /// Host application was replaced and should be relaunched
    RelaunchRequested,

    /// A signal the handler does not act upon
    SignalIgnored { action: String },
}
