use relup_types::UpdatePhase;
use serde::{Deserialize, Serialize};

/// Orchestrator-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateEvent {
    /// Update attempt moved to a new phase
    PhaseChanged {
        version: String,
        from: UpdatePhase,
        to: UpdatePhase,
    },

    /// Update attempt refused before any request was made
    Skipped { version: String, reason: String },

    /// Update attempt cancelled by the caller
    Cancelled { version: String },
}
