//! Installer status codes, outcomes and inbound signals

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an installer-service session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallSessionId(u32);

impl InstallSessionId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstallSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw status code reported by the installer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallStatus(pub i32);

impl InstallStatus {
    pub const PENDING_USER_ACTION: Self = Self(-1);
    pub const SUCCESS: Self = Self(0);
    pub const FAILURE: Self = Self(1);
    pub const FAILURE_BLOCKED: Self = Self(2);
    pub const FAILURE_ABORTED: Self = Self(3);
    pub const FAILURE_INVALID: Self = Self(4);
    pub const FAILURE_CONFLICT: Self = Self(5);
    pub const FAILURE_STORAGE: Self = Self(6);
    pub const FAILURE_INCOMPATIBLE: Self = Self(7);

    /// Failure category for the failure family, `None` otherwise
    #[must_use]
    pub fn failure_kind(self) -> Option<FailureKind> {
        let kind = match self {
            Self::FAILURE => FailureKind::Generic,
            Self::FAILURE_BLOCKED => FailureKind::Blocked,
            Self::FAILURE_ABORTED => FailureKind::Aborted,
            Self::FAILURE_INVALID => FailureKind::Invalid,
            Self::FAILURE_CONFLICT => FailureKind::Conflict,
            Self::FAILURE_STORAGE => FailureKind::Storage,
            Self::FAILURE_INCOMPATIBLE => FailureKind::Incompatible,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of an installer rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Generic,
    Aborted,
    Blocked,
    Conflict,
    Incompatible,
    Invalid,
    Storage,
}

/// Prompt the installer needs the user to accept before it proceeds.
///
/// The token is opaque to relup and is handed back to the UI as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationIntent {
    pub session: InstallSessionId,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Interpreted installer result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstallOutcome {
    ConfirmationRequired(ConfirmationIntent),
    Success,
    Failure { kind: FailureKind, message: String },
    Unrecognized { code: i32, message: String },
}

impl InstallOutcome {
    /// Classify a raw status report.
    ///
    /// A pending-user-action status without an intent cannot be surfaced and
    /// is treated as an invalid failure.
    #[must_use]
    pub fn from_status(
        status: InstallStatus,
        message: Option<String>,
        confirmation: Option<ConfirmationIntent>,
    ) -> Self {
        let message = message.unwrap_or_default();
        if status == InstallStatus::PENDING_USER_ACTION {
            return match confirmation {
                Some(intent) => Self::ConfirmationRequired(intent),
                None => Self::Failure {
                    kind: FailureKind::Invalid,
                    message: "confirmation requested without an intent".to_string(),
                },
            };
        }
        if status == InstallStatus::SUCCESS {
            return Self::Success;
        }
        match status.failure_kind() {
            Some(kind) => Self::Failure { kind, message },
            None => Self::Unrecognized {
                code: status.0,
                message,
            },
        }
    }

    /// Success and every failure shape end the install attempt
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ConfirmationRequired(_))
    }
}

/// Message delivered to the outcome handler by the installer service or host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum InstallerSignal {
    /// Status report for a committed session
    SessionStatus {
        session: InstallSessionId,
        status: InstallStatus,
        message: Option<String>,
        confirmation: Option<ConfirmationIntent>,
    },
    /// The running application was replaced in place by a new package
    PackageReplaced,
    /// Any other action routed to the handler
    Other { action: String },
}
