//! Release update orchestrator
//!
//! [`ReleaseUpdater`] composes the download and install stages for one
//! release and owns the [`UpdatePhase`] of the attempt. The downloader talks
//! back through a bridge listener holding a weak reference, so dropping the
//! updater tears the whole attempt down.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relup_download::{DownloadContext, DownloaderSettings, ReleaseDownloader, ReleaseListener};
use relup_errors::{DownloadError, Error, InstallError};
use relup_events::{AppEvent, EventEmitter, EventSender, FailureContext, UpdateEvent};
use relup_install::{
    InstallSourceDetector, OutcomeAction, OutcomeHandler, PackageInstaller, SessionSettings,
};
use relup_platform::{signal_channel, SignalReceiver, SignalSender};
use relup_types::{
    ConfirmationIntent, InstallSessionId, InstallerSignal, LocalArtifact, ReleaseArtifact,
    TerminalState, UpdatePhase,
};
use std::sync::{Arc, OnceLock, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{OpsCtx, UpdateReport};

#[derive(Default)]
struct UpdaterState {
    session: Option<InstallSessionId>,
    confirmation: Option<ConfirmationIntent>,
    failure: Option<FailureContext>,
    relaunch_requested: bool,
    install_task: Option<AbortHandle>,
    router_task: Option<JoinHandle<()>>,
    /// Taken by the signal router when the attempt starts
    signals_rx: Option<SignalReceiver>,
}

struct UpdaterInner {
    artifact: ReleaseArtifact,
    downloader: ReleaseDownloader,
    installer: PackageInstaller,
    outcomes: Arc<OutcomeHandler>,
    detector: InstallSourceDetector,
    signals: SignalSender,
    phase: watch::Sender<UpdatePhase>,
    state: Mutex<UpdaterState>,
    events: EventSender,
    runtime: Handle,
}

impl EventEmitter for UpdaterInner {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.events)
    }
}

/// Forwards downloader callbacks to the consumer and the updater
struct DownloadBridge {
    updater: OnceLock<Weak<UpdaterInner>>,
    consumer: Option<Arc<dyn ReleaseListener>>,
}

impl DownloadBridge {
    fn updater(&self) -> Option<Arc<UpdaterInner>> {
        self.updater.get().and_then(Weak::upgrade)
    }
}

impl ReleaseListener for DownloadBridge {
    fn on_start(&self, enqueued_at: DateTime<Utc>) {
        if let Some(updater) = self.updater() {
            updater.advance(UpdatePhase::Downloading);
        }
        if let Some(consumer) = &self.consumer {
            consumer.on_start(enqueued_at);
        }
    }

    fn on_progress(&self, bytes_so_far: u64, bytes_total: Option<u64>) -> bool {
        if let Some(updater) = self.updater() {
            updater.advance(UpdatePhase::Downloading);
        }
        self.consumer
            .as_ref()
            .map_or(true, |consumer| consumer.on_progress(bytes_so_far, bytes_total))
    }

    fn on_complete(&self, artifact: LocalArtifact) {
        if let Some(consumer) = &self.consumer {
            consumer.on_complete(artifact.clone());
        }
        if let Some(updater) = self.updater() {
            updater.on_downloaded(artifact);
        }
    }

    fn on_error(&self, error: DownloadError) {
        if let Some(consumer) = &self.consumer {
            consumer.on_error(error.clone());
        }
        if let Some(updater) = self.updater() {
            updater.fail(FailureContext::from_error(&error));
        }
    }
}

/// Downloads and installs one release.
///
/// Cloning is cheap and every clone drives the same attempt.
#[derive(Clone)]
pub struct ReleaseUpdater {
    inner: Arc<UpdaterInner>,
}

impl std::fmt::Debug for ReleaseUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseUpdater")
            .field("artifact", &self.inner.artifact)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl ReleaseUpdater {
    /// Build an updater for `artifact` from the operations context.
    ///
    /// `listener` receives the download callbacks as they happen. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if no runtime is available or the persisted download
    /// id cannot be read.
    pub fn new(
        ctx: &OpsCtx,
        artifact: ReleaseArtifact,
        listener: Option<Arc<dyn ReleaseListener>>,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::internal(format!("release updater needs a tokio runtime: {e}")))?;

        let bridge = Arc::new(DownloadBridge {
            updater: OnceLock::new(),
            consumer: listener,
        });
        let context = DownloadContext::new(ctx.platform.downloads(), ctx.platform.store())
            .with_settings(DownloaderSettings::from(&ctx.config.download))
            .with_event_sender(ctx.tx.clone());
        let downloader = ReleaseDownloader::new(
            artifact.clone(),
            context,
            Arc::clone(&bridge) as Arc<dyn ReleaseListener>,
        )?;

        let installer = PackageInstaller::new(
            ctx.platform.installer(),
            SessionSettings::from(&ctx.config.install),
        )
        .with_event_sender(ctx.tx.clone());
        let outcomes = Arc::new(OutcomeHandler::new().with_event_sender(ctx.tx.clone()));
        let detector = InstallSourceDetector::from_config(ctx.platform.source(), &ctx.config.sources);
        let (signals, signals_rx) = signal_channel();
        let (phase, _) = watch::channel(UpdatePhase::Idle);

        let inner = Arc::new(UpdaterInner {
            artifact,
            downloader,
            installer,
            outcomes,
            detector,
            signals,
            phase,
            state: Mutex::new(UpdaterState {
                signals_rx: Some(signals_rx),
                ..UpdaterState::default()
            }),
            events: ctx.tx.clone(),
            runtime,
        });
        // Set exactly once, right here
        let _ = bridge.updater.set(Arc::downgrade(&inner));

        Ok(Self { inner })
    }

    #[must_use]
    pub fn artifact(&self) -> &ReleaseArtifact {
        &self.inner.artifact
    }

    /// The download stage of this attempt
    #[must_use]
    pub fn downloader(&self) -> &ReleaseDownloader {
        &self.inner.downloader
    }

    #[must_use]
    pub fn phase(&self) -> UpdatePhase {
        *self.inner.phase.borrow()
    }

    /// Watch phase changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UpdatePhase> {
        self.inner.phase.subscribe()
    }

    /// Sender for signals the host routes to the updater, e.g.
    /// [`InstallerSignal::PackageReplaced`]
    #[must_use]
    pub fn signal_sender(&self) -> SignalSender {
        self.inner.signals.clone()
    }

    /// Start the attempt, resuming a download persisted by an earlier run.
    ///
    /// A no-op once the attempt has ended.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::InstalledFromStore`] when the application was
    /// installed from a store that delivers updates itself.
    pub fn start(&self) -> Result<(), Error> {
        self.inner.start()
    }

    /// Resume monitoring the download, e.g. once the consumer is back in
    /// the foreground. Optional releases are only monitored on request.
    ///
    /// A no-op until [`start`](Self::start) has run.
    pub fn resume(&self) {
        if self.phase() == UpdatePhase::Idle {
            debug!("resume before start ignored");
            return;
        }
        self.inner.downloader.resume();
    }

    /// Stop the attempt. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Wait until the attempt ends and return its final phase
    #[allow(clippy::let_and_return)]
    pub async fn wait(&self) -> UpdatePhase {
        let mut phases = self.subscribe();
        // Bound so the watch::Ref is released before `phases` drops
        let ended = match phases.wait_for(|phase| phase.is_terminal()).await {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };
        ended
    }

    /// Start the attempt and wait for it to end
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt could not be started.
    pub async fn run(&self) -> Result<UpdateReport, Error> {
        self.start()?;
        self.wait().await;
        Ok(self.report())
    }

    /// Snapshot of the attempt
    #[must_use]
    pub fn report(&self) -> UpdateReport {
        let state = self.inner.state.lock();
        UpdateReport {
            version: self.inner.artifact.label(),
            phase: self.phase(),
            session: state.session.map(InstallSessionId::get),
            confirmation: state.confirmation.clone(),
            failure: state.failure.clone(),
            relaunch_requested: state.relaunch_requested,
        }
    }
}

impl UpdaterInner {
    fn start(self: &Arc<Self>) -> Result<(), Error> {
        if self.phase.borrow().is_terminal() {
            debug!("update attempt already ended");
            return Ok(());
        }

        let source = self.detector.detect();
        if source.is_store() {
            let error = InstallError::InstalledFromStore {
                installer: source.installer().unwrap_or_default().to_string(),
            };
            warn!(error = %error, "refusing to self-update");
            self.emit(AppEvent::Update(UpdateEvent::Skipped {
                version: self.artifact.label(),
                reason: error.to_string(),
            }));
            self.state.lock().failure = Some(FailureContext::from_error(&error));
            self.advance(UpdatePhase::Terminal(TerminalState::Failed));
            return Err(error.into());
        }

        self.spawn_router();
        let next = if self.downloader.is_downloading() {
            UpdatePhase::Downloading
        } else {
            UpdatePhase::Requesting
        };
        self.advance(next);
        self.downloader.start();
        Ok(())
    }

    fn spawn_router(self: &Arc<Self>) {
        let mut state = self.state.lock();
        let Some(mut signals) = state.signals_rx.take() else {
            return;
        };
        let updater = Arc::downgrade(self);
        state.router_task = Some(self.runtime.spawn(async move {
            while let Some(signal) = signals.recv().await {
                let Some(updater) = updater.upgrade() else {
                    break;
                };
                updater.on_signal(signal);
            }
        }));
    }

    /// Move to `next` if that is a legal transition. Returns whether it moved.
    fn advance(&self, next: UpdatePhase) -> bool {
        let mut from = None;
        self.phase.send_if_modified(|phase| {
            if *phase != next && phase.can_advance_to(next) {
                from = Some(*phase);
                *phase = next;
                true
            } else {
                false
            }
        });
        match from {
            Some(from) => {
                info!(version = %self.artifact.version, from = %from, to = %next, "update phase changed");
                self.emit_phase_changed(self.artifact.label(), from, next);
                true
            }
            None => false,
        }
    }

    fn on_downloaded(self: &Arc<Self>, artifact: LocalArtifact) {
        if !self.advance(UpdatePhase::Installing) {
            if self.phase.borrow().is_terminal() {
                debug!("download completed after the attempt ended");
                return;
            }
            let error = Error::internal(format!(
                "download completed while the update was {}",
                *self.phase.borrow()
            ));
            warn!(error = %error, path = %artifact.path.display(), "dropping completed download");
            self.downloader.discard();
            self.fail(FailureContext::from_error(&error));
            return;
        }

        let install = self.installer.install_package(
            artifact,
            self.signals.clone(),
            Arc::clone(&self.outcomes),
        );
        self.state.lock().install_task = Some(install.abort_handle());
        let updater = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let result = match install.await {
                Ok(result) => result.map_err(Error::from),
                Err(e) if e.is_cancelled() => return,
                Err(e) => Err(Error::internal(format!("install task failed: {e}"))),
            };
            if let Some(updater) = updater.upgrade() {
                updater.on_installed(result);
            }
        });
    }

    fn on_installed(&self, result: Result<InstallSessionId, Error>) {
        match result {
            Ok(session) => {
                debug!(session = %session, "waiting for installer outcome");
                self.state.lock().session = Some(session);
            }
            Err(error) => {
                if self.phase.borrow().is_terminal() {
                    return;
                }
                error!(error = %error, "Failed to install the new release");
                let failure = FailureContext::from_error(&error);
                self.emit_install_failed(None, None, failure.clone());
                self.downloader.discard();
                self.fail(failure);
            }
        }
    }

    fn on_signal(&self, signal: InstallerSignal) {
        match self.outcomes.handle(signal) {
            OutcomeAction::RequestConfirmation(intent) => {
                self.state.lock().confirmation = Some(intent);
            }
            OutcomeAction::Finished => {
                self.state.lock().confirmation = None;
                self.downloader.discard();
                self.advance(UpdatePhase::Terminal(TerminalState::Succeeded));
            }
            action @ OutcomeAction::NotifyFailure { .. } => {
                self.state.lock().confirmation = None;
                self.downloader.discard();
                let failure = action
                    .failure()
                    .map(|error| FailureContext::from_error(&error));
                if let Some(failure) = failure {
                    self.fail(failure);
                }
            }
            OutcomeAction::Relaunch => {
                self.state.lock().relaunch_requested = true;
            }
            OutcomeAction::Ignore => {}
        }
    }

    fn fail(&self, failure: FailureContext) {
        {
            let mut state = self.state.lock();
            if state.failure.is_none() {
                state.failure = Some(failure);
            }
        }
        self.advance(UpdatePhase::Terminal(TerminalState::Failed));
    }

    fn cancel(&self) {
        let moved = self.advance(UpdatePhase::Terminal(TerminalState::Cancelled));
        self.outcomes.cancel();
        self.downloader.cancel();

        let (install, router) = {
            let mut state = self.state.lock();
            (state.install_task.take(), state.router_task.take())
        };
        if let Some(task) = install {
            task.abort();
        }
        if let Some(task) = router {
            task.abort();
        }
        if moved {
            info!(version = %self.artifact.version, "update cancelled");
            self.emit(AppEvent::Update(UpdateEvent::Cancelled {
                version: self.artifact.label(),
            }));
        } else {
            debug!("update attempt already ended");
        }
    }
}
