//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use relup_errors::InstallError;
    use relup_events::{AppEvent, EventReceiver, InstallEvent};
    use relup_install::*;
    use relup_platform::mock::MockInstallerService;
    use relup_platform::{signal_channel, SignalReceiver};
    use relup_types::{InstallSessionId, InstallStatus, InstallerSignal, LocalArtifact};
    use std::sync::Arc;
    use tempfile::TempDir;

    const STREAM: &str = "RelupPackageInstallerStream";

    fn artifact(temp: &TempDir, len: usize) -> (LocalArtifact, Vec<u8>) {
        let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = temp.path().join("release.pkg");
        std::fs::write(&path, &content).unwrap();
        (
            LocalArtifact {
                path,
                size: len as u64,
            },
            content,
        )
    }

    fn installer(service: &MockInstallerService) -> PackageInstaller {
        PackageInstaller::new(Arc::new(service.clone()), SessionSettings::default())
    }

    fn drain(events: &mut EventReceiver) -> Vec<AppEvent> {
        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        received
    }

    fn next_signal(signals: &mut SignalReceiver) -> InstallerSignal {
        signals.try_recv().expect("installer delivered a signal")
    }

    #[tokio::test]
    async fn test_streams_package_in_chunks() {
        let temp = TempDir::new().unwrap();
        let (local, content) = artifact(&temp, 150_000);
        let service = MockInstallerService::new();
        let (tx, _rx) = signal_channel();
        let outcomes = OutcomeHandler::new();

        let session = installer(&service)
            .install(&local, tx, &outcomes)
            .await
            .unwrap();

        assert_eq!(session, InstallSessionId::new(1));
        assert_eq!(outcomes.session(), Some(session));
        let record = &service.sessions()[0];
        assert_eq!(record.writes, 3);
        assert_eq!(record.bytes, content);
        assert_eq!(record.stream.as_deref(), Some(STREAM));
        assert!(record.fsynced && record.committed && record.closed);
        assert!(!record.abandoned);
    }

    #[tokio::test]
    async fn test_empty_package_still_commits() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 0);
        let service = MockInstallerService::new();
        let (tx, _rx) = signal_channel();

        installer(&service)
            .install(&local, tx, &OutcomeHandler::new())
            .await
            .unwrap();

        let record = &service.sessions()[0];
        assert_eq!(record.writes, 0);
        assert!(record.committed);
    }

    #[tokio::test]
    async fn test_open_failure() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 10);
        let service = MockInstallerService::new();
        service.fail_open("no sessions left");
        let (tx, _rx) = signal_channel();

        let err = installer(&service)
            .install(&local, tx, &OutcomeHandler::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::SessionOpenFailed { .. }));
        assert!(service.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_abandons_session() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 100_000);
        let service = MockInstallerService::new();
        service.fail_write_at(1);
        let (tx, _rx) = signal_channel();
        let outcomes = OutcomeHandler::new();

        let err = installer(&service)
            .install(&local, tx, &outcomes)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::StreamFailed { session: 1, .. }));
        let record = &service.sessions()[0];
        assert!(record.abandoned);
        assert!(!record.committed && !record.closed);
        assert_eq!(outcomes.session(), None);
    }

    #[tokio::test]
    async fn test_missing_file_abandons_session() {
        let temp = TempDir::new().unwrap();
        let local = LocalArtifact {
            path: temp.path().join("gone.pkg"),
            size: 10,
        };
        let service = MockInstallerService::new();
        let (tx, _rx) = signal_channel();

        let err = installer(&service)
            .install(&local, tx, &OutcomeHandler::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::ArtifactUnreadable { .. }));
        assert!(service.sessions()[0].abandoned);
    }

    #[tokio::test]
    async fn test_commit_failure_abandons_session() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 10);
        let service = MockInstallerService::new();
        service.fail_commit("sealed");
        let (tx, _rx) = signal_channel();

        let err = installer(&service)
            .install(&local, tx, &OutcomeHandler::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::CommitFailed { session: 1, .. }));
        assert!(service.sessions()[0].abandoned);
    }

    #[tokio::test]
    async fn test_spawned_install_reports_success() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 1024);
        let service = MockInstallerService::new();
        service.deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let (tx, mut rx) = signal_channel();
        let (events_tx, mut events) = relup_events::channel();
        let outcomes = Arc::new(OutcomeHandler::new().with_event_sender(events_tx.clone()));

        let session = installer(&service)
            .with_event_sender(events_tx)
            .install_package(local, tx, Arc::clone(&outcomes))
            .await
            .unwrap()
            .unwrap();

        let action = outcomes.handle(next_signal(&mut rx));
        assert_eq!(action, OutcomeAction::Finished);
        assert_eq!(outcomes.session(), None);

        let received = drain(&mut events);
        assert!(received.iter().any(|e| matches!(
            e,
            AppEvent::Install(InstallEvent::Committed { session: s }) if *s == session.get()
        )));
        assert!(received.iter().any(|e| matches!(
            e,
            AppEvent::Install(InstallEvent::Succeeded { session: Some(1) })
        )));
    }

    #[tokio::test]
    async fn test_confirmation_then_success() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 10);
        let service = MockInstallerService::new();
        service.deliver_on_commit(InstallStatus::PENDING_USER_ACTION, None, true);
        let (tx, mut rx) = signal_channel();
        let (events_tx, mut events) = relup_events::channel();
        let outcomes = OutcomeHandler::new().with_event_sender(events_tx);

        let session = installer(&service)
            .install(&local, tx.clone(), &outcomes)
            .await
            .unwrap();

        let action = outcomes.handle(next_signal(&mut rx));
        let OutcomeAction::RequestConfirmation(intent) = action else {
            panic!("expected a confirmation request, got {action:?}");
        };
        assert_eq!(intent.session, session);
        assert_eq!(intent.token, "confirm-1");
        assert_eq!(outcomes.session(), Some(session));
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            AppEvent::Install(InstallEvent::ConfirmationRequired { .. })
        )));

        // The user accepted; the installer reports again on the same session
        tx.send(InstallerSignal::SessionStatus {
            session,
            status: InstallStatus::SUCCESS,
            message: None,
            confirmation: None,
        })
        .unwrap();
        assert_eq!(outcomes.handle(next_signal(&mut rx)), OutcomeAction::Finished);
    }

    #[tokio::test]
    async fn test_failure_family_shows_generic_notice() {
        let temp = TempDir::new().unwrap();
        let (local, _) = artifact(&temp, 10);
        let service = MockInstallerService::new();
        service.deliver_on_commit(InstallStatus::FAILURE_STORAGE, Some("no space".into()), false);
        let (tx, mut rx) = signal_channel();
        let (events_tx, mut events) = relup_events::channel();
        let outcomes = OutcomeHandler::new().with_event_sender(events_tx);

        installer(&service)
            .install(&local, tx, &outcomes)
            .await
            .unwrap();

        let action = outcomes.handle(next_signal(&mut rx));
        assert_eq!(
            action,
            OutcomeAction::NotifyFailure {
                code: 6,
                message: "no space".into()
            }
        );

        let notices: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::Install(InstallEvent::Failed { code, failure, .. }) => {
                    Some((code, failure.message))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            notices,
            vec![(
                Some(6),
                "Something went wrong during installing the new release.".to_string()
            )]
        );
    }

    #[test]
    fn test_foreign_sessions_and_cancellation_are_ignored() {
        let outcomes = OutcomeHandler::new();
        outcomes.expect_session(InstallSessionId::new(2));

        let foreign = InstallerSignal::SessionStatus {
            session: InstallSessionId::new(9),
            status: InstallStatus::SUCCESS,
            message: None,
            confirmation: None,
        };
        assert_eq!(outcomes.handle(foreign), OutcomeAction::Ignore);
        assert_eq!(
            outcomes.handle(InstallerSignal::Other {
                action: "boot_completed".into()
            }),
            OutcomeAction::Ignore
        );
        assert_eq!(
            outcomes.handle(InstallerSignal::PackageReplaced),
            OutcomeAction::Relaunch
        );

        outcomes.cancel();
        outcomes.cancel();
        let own = InstallerSignal::SessionStatus {
            session: InstallSessionId::new(2),
            status: InstallStatus::SUCCESS,
            message: None,
            confirmation: None,
        };
        assert_eq!(outcomes.handle(own), OutcomeAction::Ignore);
        assert_eq!(
            outcomes.handle(InstallerSignal::PackageReplaced),
            OutcomeAction::Ignore
        );
    }

    #[test]
    fn test_detector_from_config() {
        let config = relup_config::SourcesConfig {
            extra_local_stores: vec!["org.example.sideloader".into()],
            ..relup_config::SourcesConfig::default()
        };
        let probe = relup_platform::StaticSourceProbe::new(
            Some("org.example.sideloader".into()),
            config.package_name.clone(),
        );
        let detector = InstallSourceDetector::from_config(Arc::new(probe), &config);
        assert_eq!(
            detector.detect(),
            InstallSource::Local {
                installer: "org.example.sideloader".into()
            }
        );
    }
}
