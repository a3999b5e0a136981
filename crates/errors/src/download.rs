//! Download pipeline error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Failures of the request, monitor and watchdog stages.
///
/// None of these are retried automatically; the caller starts a new attempt.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DownloadError {
    #[error("download request for {url} was rejected: {message}")]
    RequestFailed { url: String, message: String },

    #[error("Failed to start downloading file due to timeout exception.")]
    PendingTimeout { id: i64, timeout_secs: u64 },

    #[error("download {id} failed: {reason}")]
    TransferFailed { id: i64, reason: String },

    #[error("Cannot find download with id={id}")]
    NotFound { id: i64 },

    #[error("The file is invalid")]
    InvalidArtifact { expected: u64, actual: u64 },

    #[error("Cannot check file size: {message}")]
    SizeCheckFailed { message: String },

    #[error("Downloaded file not found")]
    ArtifactMissing { id: i64 },

    #[error("download service error: {message}")]
    Service { message: String },
}

impl UserFacingError for DownloadError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RequestFailed { .. } | Self::PendingTimeout { .. } => {
                Some("Check your network connection and start the update again.")
            }
            Self::InvalidArtifact { .. } => {
                Some("The release package did not match its published size; try again later.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. }
                | Self::PendingTimeout { .. }
                | Self::TransferFailed { .. }
                | Self::Service { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::RequestFailed { .. } => "download.request_failed",
            Self::PendingTimeout { .. } => "download.pending_timeout",
            Self::TransferFailed { .. } => "download.transfer_failed",
            Self::NotFound { .. } => "download.not_found",
            Self::InvalidArtifact { .. } => "download.invalid_artifact",
            Self::SizeCheckFailed { .. } => "download.size_check_failed",
            Self::ArtifactMissing { .. } => "download.artifact_missing",
            Self::Service { .. } => "download.service",
        };
        Some(code)
    }
}
