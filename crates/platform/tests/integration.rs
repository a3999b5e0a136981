//! Integration tests for platform

#[cfg(test)]
mod tests {
    use relup_platform::*;
    use relup_types::{InstallStatus, InstallerSignal};
    use tempfile::TempDir;

    fn installer(temp: &TempDir) -> StagingInstaller {
        StagingInstaller::new(temp.path().join("staging"), temp.path().join("installed"))
    }

    #[tokio::test]
    async fn test_staging_commit_places_package() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let (tx, mut rx) = signal_channel();

        let mut session = installer.open_session().await.unwrap();
        session.write("pkg", 0, b"hello ").await.unwrap();
        session.write("pkg", 6, b"world").await.unwrap();
        session.fsync("pkg").await.unwrap();
        let id = session.id();
        session.commit(OutcomeToken::new(id, tx)).await.unwrap();
        session.close().await.unwrap();

        let placed = std::fs::read(temp.path().join("installed/pkg.pkg")).unwrap();
        assert_eq!(placed, b"hello world");

        match rx.recv().await.unwrap() {
            InstallerSignal::SessionStatus { status, .. } => {
                assert_eq!(status, InstallStatus::SUCCESS);
            }
            other => panic!("unexpected signal {other:?}"),
        }
        assert!(!temp.path().join("staging/session-1").exists());
    }

    #[tokio::test]
    async fn test_empty_commit_reports_invalid() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);
        let (tx, mut rx) = signal_channel();

        let mut session = installer.open_session().await.unwrap();
        let id = session.id();
        session.commit(OutcomeToken::new(id, tx)).await.unwrap();

        match rx.recv().await.unwrap() {
            InstallerSignal::SessionStatus { status, .. } => {
                assert_eq!(status, InstallStatus::FAILURE_INVALID);
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_abandon_discards_staged_bytes() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        let mut session = installer.open_session().await.unwrap();
        session.write("pkg", 0, b"partial").await.unwrap();
        session.abandon().await.unwrap();

        assert!(!temp.path().join("staging/session-1").exists());
        assert!(!temp.path().join("installed/pkg.pkg").exists());
        assert!(session.write("pkg", 7, b"more").await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_session_cleans_up() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        let mut session = installer.open_session().await.unwrap();
        session.write("pkg", 0, b"x").await.unwrap();
        drop(session);

        assert!(!temp.path().join("staging/session-1").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_stream_names() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp);

        let mut session = installer.open_session().await.unwrap();
        assert!(session.write("../escape", 0, b"x").await.is_err());
    }

    #[test]
    fn test_token_reports_dropped_receiver() {
        let (tx, rx) = signal_channel();
        let token = OutcomeToken::new(relup_types::InstallSessionId::new(3), tx);
        assert!(token.deliver(InstallStatus::SUCCESS, None, None));
        drop(rx);
        assert!(!token.deliver(InstallStatus::SUCCESS, None, None));
    }

    #[test]
    fn test_static_probe() {
        let probe = StaticSourceProbe::new(Some("adb".into()), "com.example.app");
        assert_eq!(probe.installer_package_name().as_deref(), Some("adb"));
        assert_eq!(probe.own_package_name(), "com.example.app");
    }
}
