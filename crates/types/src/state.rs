//! Orchestrator phase

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an update attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    Succeeded,
    Failed,
    Cancelled,
}

/// Phase of a release update attempt.
///
/// `Idle -> Requesting -> Downloading -> Installing -> Terminal`, with
/// `Terminal(Cancelled)` and `Terminal(Failed)` reachable from any
/// non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", content = "state", rename_all = "lowercase")]
pub enum UpdatePhase {
    #[default]
    Idle,
    Requesting,
    Downloading,
    Installing,
    Terminal(TerminalState),
}

impl UpdatePhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Whether moving to `next` is a legal forward transition
    #[must_use]
    pub fn can_advance_to(self, next: UpdatePhase) -> bool {
        match (self, next) {
            (Self::Terminal(_), _) => false,
            (_, Self::Terminal(_)) => true,
            (Self::Idle, Self::Requesting | Self::Downloading)
            | (Self::Requesting, Self::Downloading)
            | (Self::Downloading, Self::Installing) => true,
            _ => false,
        }
    }
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Requesting => write!(f, "requesting"),
            Self::Downloading => write!(f, "downloading"),
            Self::Installing => write!(f, "installing"),
            Self::Terminal(TerminalState::Succeeded) => write!(f, "succeeded"),
            Self::Terminal(TerminalState::Failed) => write!(f, "failed"),
            Self::Terminal(TerminalState::Cancelled) => write!(f, "cancelled"),
        }
    }
}
