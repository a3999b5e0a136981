//! Errors raised by the download, installer and store collaborators

use crate::{DownloadError, InstallError, UserFacingError};
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur while talking to a platform service
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("download service failed: {operation} - {message}")]
    DownloadServiceFailed { operation: String, message: String },

    #[error("installer service failed: {operation} - {message}")]
    InstallerServiceFailed { operation: String, message: String },

    #[error("platform capability not available: {capability}")]
    CapabilityUnavailable { capability: String },

    #[error("permission denied: {operation} - {message}")]
    PermissionDenied { operation: String, message: String },
}

impl From<PlatformError> for DownloadError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::DownloadServiceFailed { message, .. } => {
                DownloadError::Service { message }
            }
            other => DownloadError::Service {
                message: other.to_string(),
            },
        }
    }
}

impl From<PlatformError> for InstallError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::InstallerServiceFailed { operation, message }
                if operation == "open_session" =>
            {
                InstallError::SessionOpenFailed { message }
            }
            other => InstallError::SessionOpenFailed {
                message: other.to_string(),
            },
        }
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DownloadServiceFailed { .. } => "platform.download_service",
            Self::InstallerServiceFailed { .. } => "platform.installer_service",
            Self::CapabilityUnavailable { .. } => "platform.capability_unavailable",
            Self::PermissionDenied { .. } => "platform.permission_denied",
        };
        Some(code)
    }
}
