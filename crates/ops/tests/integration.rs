//! Integration tests for the update orchestrator

#[cfg(test)]
mod tests {
    use relup_config::constants::DOWNLOAD_ID_KEY;
    use relup_errors::{Error, InstallError};
    use relup_events::{AppEvent, EventReceiver, UpdateEvent};
    use relup_ops::*;
    use relup_platform::mock::{MockDownloadService, MockInstallerService};
    use relup_platform::{KeyValueStore, Platform, StaticSourceProbe};
    use relup_state::MemoryStore;
    use relup_types::{
        DownloadId, DownloadStatus, InstallStatus, InstallerSignal, LocalArtifact,
        ReleaseArtifact, TerminalState, UpdatePhase, Version,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const SIZE: u64 = 4096;

    struct Fixture {
        downloads: MockDownloadService,
        installer: MockInstallerService,
        store: Arc<MemoryStore>,
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                downloads: MockDownloadService::new(),
                installer: MockInstallerService::new(),
                store: Arc::new(MemoryStore::new()),
                temp: TempDir::new().unwrap(),
            }
        }

        fn ctx_with_installer(&self, installer: Option<&str>) -> (OpsCtx, EventReceiver) {
            let (tx, rx) = relup_events::channel();
            let platform = Platform::new(
                Arc::new(self.downloads.clone()),
                Arc::new(self.installer.clone()),
                Arc::clone(&self.store) as Arc<dyn KeyValueStore>,
                Arc::new(StaticSourceProbe::new(installer.map(String::from), "relup")),
            );
            let ctx = OpsContextBuilder::new()
                .with_platform(platform)
                .with_event_sender(tx)
                .build()
                .unwrap();
            (ctx, rx)
        }

        fn ctx(&self) -> (OpsCtx, EventReceiver) {
            self.ctx_with_installer(None)
        }

        /// Place a downloaded package on disk and let the service report it
        fn complete(&self, id: DownloadId, size: u64) {
            let path = self.temp.path().join(format!("{id}.artifact"));
            std::fs::write(&path, vec![7u8; usize::try_from(size).unwrap()]).unwrap();
            self.downloads.set_status(id, DownloadStatus::succeeded(size));
            self.downloads
                .set_artifact(id, Some(LocalArtifact { path, size }));
        }
    }

    fn release(mandatory: bool) -> ReleaseArtifact {
        ReleaseArtifact::new("https://example.com/relup-2.0.0.pkg", SIZE, Version::new(2, 0, 0))
            .mandatory(mandatory)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    async fn finish(updater: &ReleaseUpdater) -> UpdatePhase {
        tokio::time::timeout(Duration::from_secs(60), updater.wait())
            .await
            .expect("update attempt ended")
    }

    fn phase_changes(events: &mut EventReceiver) -> Vec<(UpdatePhase, UpdatePhase)> {
        let mut changes = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AppEvent::Update(UpdateEvent::PhaseChanged { from, to, .. }) = event {
                changes.push((from, to));
            }
        }
        changes
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_then_install_succeeds() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let (ctx, mut events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        assert_eq!(updater.phase(), UpdatePhase::Downloading);
        fixture.complete(id, SIZE);

        let phase = finish(&updater).await;
        settle().await;

        assert_eq!(phase, UpdatePhase::Terminal(TerminalState::Succeeded));
        let report = updater.report();
        assert!(report.is_success());
        assert_eq!(report.session, Some(1));
        let session = &fixture.installer.sessions()[0];
        assert_eq!(session.bytes.len() as u64, SIZE);
        assert!(session.committed && session.closed);

        // The artifact is discarded once installed
        assert!(fixture.downloads.removed().contains(&id));
        assert_eq!(fixture.store.peek(DOWNLOAD_ID_KEY), None);

        assert_eq!(
            phase_changes(&mut events),
            vec![
                (UpdatePhase::Idle, UpdatePhase::Requesting),
                (UpdatePhase::Requesting, UpdatePhase::Downloading),
                (UpdatePhase::Downloading, UpdatePhase::Installing),
                (
                    UpdatePhase::Installing,
                    UpdatePhase::Terminal(TerminalState::Succeeded)
                ),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_release_waits_for_resume() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(false), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        fixture.complete(id, SIZE);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(updater.phase(), UpdatePhase::Downloading);

        updater.resume();
        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Succeeded)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_artifact_fails_attempt() {
        let fixture = Fixture::new();
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        fixture.complete(id, SIZE / 2);

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Failed)
        );
        let failure = updater.report().failure.unwrap();
        assert_eq!(failure.code.as_deref(), Some("download.invalid_artifact"));
        assert_eq!(failure.message, "The file is invalid");
        assert!(fixture.installer.sessions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_then_success() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::PENDING_USER_ACTION, None, true);
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        fixture.complete(id, SIZE);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(updater.phase(), UpdatePhase::Installing);
        let report = updater.report();
        let intent = report.confirmation.expect("confirmation requested");
        assert_eq!(intent.token, "confirm-1");

        // The user accepted the prompt and the installer reports back
        updater
            .signal_sender()
            .send(InstallerSignal::SessionStatus {
                session: intent.session,
                status: InstallStatus::SUCCESS,
                message: None,
                confirmation: None,
            })
            .unwrap();

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Succeeded)
        );
        assert!(updater.report().confirmation.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_installer_failure_shows_generic_notice() {
        let fixture = Fixture::new();
        fixture.installer.deliver_on_commit(
            InstallStatus::FAILURE_CONFLICT,
            Some("signature mismatch".into()),
            false,
        );
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        fixture.complete(id, SIZE);

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Failed)
        );
        let failure = updater.report().failure.unwrap();
        assert_eq!(
            failure.message,
            "Something went wrong during installing the new release."
        );
        settle().await;
        assert!(fixture.downloads.removed().contains(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_failure_fails_attempt() {
        let fixture = Fixture::new();
        fixture.installer.fail_commit("read-only staging area");
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        fixture.complete(id, SIZE);

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Failed)
        );
        assert!(fixture.installer.sessions()[0].abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_installs_are_refused() {
        let fixture = Fixture::new();
        let (ctx, mut events) = fixture.ctx_with_installer(Some("com.android.vending"));
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();

        let err = updater.start().unwrap_err();

        assert!(matches!(
            err,
            Error::Install(InstallError::InstalledFromStore { .. })
        ));
        assert_eq!(updater.phase(), UpdatePhase::Terminal(TerminalState::Failed));
        assert!(fixture.downloads.submitted().is_empty());
        let mut skipped = false;
        while let Ok(event) = events.try_recv() {
            skipped |= matches!(event, AppEvent::Update(UpdateEvent::Skipped { .. }));
        }
        assert!(skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_everything() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let (ctx, mut events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();
        let id = fixture.downloads.next_id();

        updater.start().unwrap();
        settle().await;
        updater.cancel();
        updater.cancel();
        settle().await;

        assert_eq!(
            updater.phase(),
            UpdatePhase::Terminal(TerminalState::Cancelled)
        );
        assert_eq!(fixture.downloads.removed(), vec![id]);
        assert_eq!(fixture.store.peek(DOWNLOAD_ID_KEY), None);

        // Nothing moves after cancellation
        fixture.complete(id, SIZE);
        updater.resume();
        updater.start().unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fixture.installer.sessions().is_empty());
        assert_eq!(
            updater.phase(),
            UpdatePhase::Terminal(TerminalState::Cancelled)
        );

        let mut cancelled = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, AppEvent::Update(UpdateEvent::Cancelled { .. })) {
                cancelled += 1;
            }
        }
        assert_eq!(cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_package_replaced_requests_relaunch() {
        let fixture = Fixture::new();
        let (ctx, _events) = fixture.ctx();
        let updater = ReleaseUpdater::new(&ctx, release(true), None).unwrap();

        updater.start().unwrap();
        settle().await;
        updater
            .signal_sender()
            .send(InstallerSignal::PackageReplaced)
            .unwrap();
        updater
            .signal_sender()
            .send(InstallerSignal::Other {
                action: "boot_completed".into(),
            })
            .unwrap();
        settle().await;

        let report = updater.report();
        assert!(report.relaunch_requested);
        assert_eq!(updater.phase(), UpdatePhase::Downloading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resumes_persisted_download() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let id = DownloadId::new(11);
        fixture.store.put_i64(DOWNLOAD_ID_KEY, id.get()).unwrap();
        fixture
            .downloads
            .insert_existing(id, DownloadStatus::running(10, Some(SIZE)));
        fixture.complete(id, SIZE);
        let (ctx, _events) = fixture.ctx();

        let updater = ReleaseUpdater::new(&ctx, release(false), None).unwrap();
        updater.start().unwrap();

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Succeeded)
        );
        assert!(fixture.downloads.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_before_start_waits_for_start() {
        let fixture = Fixture::new();
        fixture
            .installer
            .deliver_on_commit(InstallStatus::SUCCESS, None, false);
        let id = DownloadId::new(11);
        fixture.store.put_i64(DOWNLOAD_ID_KEY, id.get()).unwrap();
        fixture
            .downloads
            .insert_existing(id, DownloadStatus::running(10, Some(SIZE)));
        fixture.complete(id, SIZE);
        let (ctx, _events) = fixture.ctx();

        let updater = ReleaseUpdater::new(&ctx, release(false), None).unwrap();
        updater.resume();
        settle().await;
        assert_eq!(updater.phase(), UpdatePhase::Idle);
        assert!(fixture.installer.sessions().is_empty());

        updater.start().unwrap();
        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Succeeded)
        );
        settle().await;
        assert_eq!(fixture.installer.sessions().len(), 1);
        assert_eq!(fixture.store.peek(DOWNLOAD_ID_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_before_start_fails_attempt() {
        let fixture = Fixture::new();
        let id = DownloadId::new(11);
        fixture.store.put_i64(DOWNLOAD_ID_KEY, id.get()).unwrap();
        fixture
            .downloads
            .insert_existing(id, DownloadStatus::running(10, Some(SIZE)));
        fixture.complete(id, SIZE);
        let (ctx, _events) = fixture.ctx();

        let updater = ReleaseUpdater::new(&ctx, release(false), None).unwrap();
        // Driving the download stage directly bypasses the updater's guard
        updater.downloader().resume();

        assert_eq!(
            finish(&updater).await,
            UpdatePhase::Terminal(TerminalState::Failed)
        );
        settle().await;
        assert!(updater.report().failure.is_some());
        assert!(fixture.installer.sessions().is_empty());
        assert_eq!(fixture.downloads.removed(), vec![id]);
        assert_eq!(fixture.store.peek(DOWNLOAD_ID_KEY), None);
    }

    #[tokio::test]
    async fn test_status_and_cancel_persisted_download() {
        let fixture = Fixture::new();
        let (ctx, _events) = fixture.ctx();
        assert_eq!(status(&ctx).await.unwrap(), DownloadReport::idle());
        assert_eq!(cancel(&ctx).await.unwrap(), None);

        let id = DownloadId::new(3);
        fixture
            .downloads
            .insert_existing(id, DownloadStatus::running(5, Some(SIZE)));
        fixture.store.put_i64(DOWNLOAD_ID_KEY, id.get()).unwrap();

        let report = status(&ctx).await.unwrap();
        assert_eq!(report.id, Some(3));
        assert_eq!(report.status, Some(DownloadStatus::running(5, Some(SIZE))));
        assert!(!report.is_complete());

        assert_eq!(cancel(&ctx).await.unwrap(), Some(id));
        assert_eq!(fixture.downloads.removed(), vec![id]);
        assert_eq!(fixture.store.peek(DOWNLOAD_ID_KEY), None);
    }

    #[test]
    fn test_operation_result_json() {
        let result = OperationResult::DownloadStatus(DownloadReport::idle());
        let json = result.to_json().unwrap();
        assert!(json.contains("\"type\": \"DownloadStatus\""));
        assert!(result.is_success());
    }

    #[test]
    fn test_context_requires_platform() {
        let (tx, _rx) = relup_events::channel();
        assert!(OpsContextBuilder::new().with_event_sender(tx).build().is_err());
    }
}
