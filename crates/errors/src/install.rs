//! Installation system error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("could not open install session: {message}")]
    SessionOpenFailed { message: String },

    #[error("could not read package {path}: {message}")]
    ArtifactUnreadable { path: String, message: String },

    #[error("streaming package into session {session} failed: {message}")]
    StreamFailed { session: u32, message: String },

    #[error("committing session {session} failed: {message}")]
    CommitFailed { session: u32, message: String },

    #[error("installer rejected the package with status {code}: {message}")]
    OutcomeFailed { code: i32, message: String },

    #[error("installer reported unrecognized status {code}")]
    UnrecognizedStatus { code: i32 },

    #[error("updates are disabled for applications installed from a store")]
    InstalledFromStore { installer: String },

    #[error("installation cancelled")]
    Cancelled,
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::OutcomeFailed { .. } | Self::UnrecognizedStatus { .. } => {
                Cow::Borrowed("Something went wrong during installing the new release.")
            }
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InstalledFromStore { .. } => {
                Some("Update the application through the store it was installed from.")
            }
            Self::SessionOpenFailed { .. } | Self::StreamFailed { .. } => {
                Some("Ensure the staging directory is writable and has free space.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionOpenFailed { .. } | Self::StreamFailed { .. } | Self::CommitFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SessionOpenFailed { .. } => "install.session_open_failed",
            Self::ArtifactUnreadable { .. } => "install.artifact_unreadable",
            Self::StreamFailed { .. } => "install.stream_failed",
            Self::CommitFailed { .. } => "install.commit_failed",
            Self::OutcomeFailed { .. } => "install.outcome_failed",
            Self::UnrecognizedStatus { .. } => "install.unrecognized_status",
            Self::InstalledFromStore { .. } => "install.installed_from_store",
            Self::Cancelled => "install.cancelled",
        };
        Some(code)
    }
}
