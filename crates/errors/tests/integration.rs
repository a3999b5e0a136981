//! Integration tests for error types

#[cfg(test)]
mod tests {
    use relup_errors::*;

    #[test]
    fn test_error_conversion() {
        let download_err = DownloadError::NotFound { id: 7 };
        let err: Error = download_err.into();
        assert!(matches!(err, Error::Download(_)));
        assert_eq!(err.user_code(), Some("download.not_found"));
    }

    #[test]
    fn test_listener_facing_messages() {
        let err = DownloadError::InvalidArtifact {
            expected: 10,
            actual: 9,
        };
        assert_eq!(err.user_message(), "The file is invalid");

        let err = DownloadError::PendingTimeout {
            id: 3,
            timeout_secs: 10,
        };
        assert_eq!(
            err.to_string(),
            "Failed to start downloading file due to timeout exception."
        );
    }

    #[test]
    fn test_install_outcome_message_is_generic() {
        let err = InstallError::OutcomeFailed {
            code: 6,
            message: "no space left".into(),
        };
        assert_eq!(
            err.user_message(),
            "Something went wrong during installing the new release."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_platform_error_maps_to_session_open() {
        let err: InstallError = PlatformError::InstallerServiceFailed {
            operation: "open_session".into(),
            message: "busy".into(),
        }
        .into();
        assert!(matches!(err, InstallError::SessionOpenFailed { message } if message == "busy"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err =
            StorageError::from_io_with_path(&io_err, std::path::Path::new("/var/lib/relup"));
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));

        let err: Error = io_err.into();
        assert!(err.is_retryable());
    }
}
