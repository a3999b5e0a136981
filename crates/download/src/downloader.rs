//! Release download state machine
//!
//! One [`ReleaseDownloader`] drives one release through request, monitoring
//! and completion. All mutable state sits behind a single reentrant lock that
//! is never held across an `.await`: service calls run in runtime tasks which
//! re-check the cancelled flag and the handle identity once they resume.

mod watchdog;

use chrono::{DateTime, Utc};
use parking_lot::ReentrantMutex;
use relup_config::DownloadConfig;
use relup_errors::{DownloadError, Error, PlatformError};
use relup_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use relup_platform::{DownloadService, KeyValueStore};
use relup_types::{DownloadId, DownloadPhase, DownloadStatus, LocalArtifact, ReleaseArtifact};
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handle::DownloadHandleStore;
use crate::listener::ReleaseListener;

/// Timing of the monitor and the pending-start watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloaderSettings {
    /// How long a download may stay pending after acceptance
    pub pending_timeout: Duration,
    /// Delay before the next progress poll
    pub progress_interval: Duration,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for DownloaderSettings {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            pending_timeout: config.pending_timeout(),
            progress_interval: config.progress_interval(),
        }
    }
}

/// Collaborators a downloader works with
#[derive(Clone)]
pub struct DownloadContext {
    pub service: Arc<dyn DownloadService>,
    pub store: Arc<dyn KeyValueStore>,
    pub settings: DownloaderSettings,
    pub events: Option<EventSender>,
}

impl DownloadContext {
    pub fn new(service: Arc<dyn DownloadService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            service,
            store,
            settings: DownloaderSettings::default(),
            events: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: DownloaderSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }
}

#[derive(Default)]
struct State {
    cancelled: bool,
    download_id: Option<DownloadId>,
    /// A terminal callback was delivered (or claimed) for the current attempt
    finished: bool,
    request_task: Option<JoinHandle<()>>,
    update_tasks: Vec<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
    poll_generation: u64,
    watchdog_task: Option<JoinHandle<()>>,
}

impl State {
    fn is_current(&self, id: DownloadId) -> bool {
        !self.cancelled && self.download_id == Some(id)
    }

    fn abort_monitoring(&mut self) {
        for task in self.update_tasks.drain(..) {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(task) = self.watchdog_task.take() {
            task.abort();
        }
        self.poll_generation += 1;
    }
}

struct Inner {
    artifact: ReleaseArtifact,
    service: Arc<dyn DownloadService>,
    handle: DownloadHandleStore,
    listener: Arc<dyn ReleaseListener>,
    settings: DownloaderSettings,
    events: Option<EventSender>,
    runtime: Handle,
    state: ReentrantMutex<RefCell<State>>,
}

impl EventEmitter for Inner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

/// Downloads one release artifact through a [`DownloadService`].
///
/// Cloning is cheap and every clone drives the same download.
#[derive(Clone)]
pub struct ReleaseDownloader {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ReleaseDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseDownloader")
            .field("artifact", &self.inner.artifact)
            .field("download_id", &self.download_id())
            .finish_non_exhaustive()
    }
}

impl ReleaseDownloader {
    /// Create a downloader, recovering a download id persisted by a previous run.
    ///
    /// Must be called from within a tokio runtime; its handle is captured so the
    /// synchronous entry points can spawn work.
    ///
    /// # Errors
    ///
    /// Returns an error if no runtime is available or the store cannot be read.
    pub fn new(
        artifact: ReleaseArtifact,
        context: DownloadContext,
        listener: Arc<dyn ReleaseListener>,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::internal(format!("release downloader needs a tokio runtime: {e}")))?;
        let handle = DownloadHandleStore::new(context.store);
        let download_id = handle.load()?;
        if let Some(id) = download_id {
            debug!(id = %id, "recovered persisted download id");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                artifact,
                service: context.service,
                handle,
                listener,
                settings: context.settings,
                events: context.events,
                runtime,
                state: ReentrantMutex::new(RefCell::new(State {
                    download_id,
                    ..State::default()
                })),
            }),
        })
    }

    #[must_use]
    pub fn artifact(&self) -> &ReleaseArtifact {
        &self.inner.artifact
    }

    /// Identifier of the active download, if any
    #[must_use]
    pub fn download_id(&self) -> Option<DownloadId> {
        self.inner.state.lock().borrow().download_id
    }

    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.download_id().is_some()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().borrow().cancelled
    }

    /// Start the attempt.
    ///
    /// With an active (possibly recovered) download this resumes monitoring;
    /// otherwise it submits the request. Only one request is ever issued.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Resume monitoring the active download, e.g. when the consumer comes
    /// back to the foreground. A no-op without one.
    pub fn resume(&self) {
        self.inner.resume();
    }

    /// Check the status of the active download once; a no-op without one
    pub fn update(&self) {
        self.inner.update();
    }

    /// Stop everything and remove the active download. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Remove the active download without notifying the listener, e.g. once
    /// the artifact has been handed to the installer
    pub fn discard(&self) {
        self.inner.discard();
    }
}

impl Inner {
    fn start(self: &Arc<Self>) {
        let guard = self.state.lock();
        let active = {
            let state = guard.borrow();
            if state.cancelled {
                return;
            }
            state.download_id
        };
        match active {
            Some(_) => self.resume(),
            None => self.request(),
        }
        drop(guard);
    }

    fn resume(self: &Arc<Self>) {
        let guard = self.state.lock();
        let active = {
            let state = guard.borrow();
            if state.cancelled || state.finished {
                return;
            }
            state.download_id
        };
        if let Some(id) = active {
            debug!(id = %id, "resuming download monitoring");
            self.emit(AppEvent::Download(DownloadEvent::Resumed { id: id.get() }));
            self.update();
        }
        drop(guard);
    }

    fn request(self: &Arc<Self>) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.cancelled {
            return;
        }
        if state.request_task.is_some() {
            debug!("Downloading is already in progress.");
            return;
        }
        let inner = Arc::clone(self);
        state.request_task = Some(self.runtime.spawn(async move {
            inner.run_request().await;
        }));
    }

    async fn run_request(self: Arc<Self>) {
        let url = self.artifact.url.clone();
        info!(url = %url, version = %self.artifact.version, "requesting release download");
        self.emit(AppEvent::Download(DownloadEvent::Requested {
            url: url.clone(),
            version: self.artifact.label(),
        }));

        match self.service.submit(&url).await {
            Ok(id) => self.on_download_started(id, Utc::now()),
            Err(e) => self.on_request_failed(DownloadError::RequestFailed {
                url,
                message: e.to_string(),
            }),
        }
    }

    fn on_download_started(self: &Arc<Self>, id: DownloadId, enqueued_at: DateTime<Utc>) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.cancelled {
                drop(state);
                debug!(id = %id, "request accepted after cancellation, removing it");
                self.spawn_remove(id);
                return;
            }
            state.download_id = Some(id);
            state.finished = false;
        }
        if let Err(e) = self.handle.save(id) {
            warn!(id = %id, error = %e, "failed to persist download id");
            self.emit_warning_with_context(
                format!("Download {id} will not be resumed after a restart"),
                e.to_string(),
            );
        }

        info!(id = %id, "download started");
        self.emit_download_started(id.get(), self.artifact.url.clone(), enqueued_at);
        self.listener.on_start(enqueued_at);

        // Mandatory updates are monitored right away
        if self.artifact.mandatory {
            self.update();
        }
        self.arm_watchdog(id);
        drop(guard);
    }

    fn on_request_failed(self: &Arc<Self>, error: DownloadError) {
        let guard = self.state.lock();
        if guard.borrow().cancelled {
            return;
        }
        self.finish_with_error(None, error);
        drop(guard);
    }

    fn update(self: &Arc<Self>) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.cancelled || state.finished {
            return;
        }
        let Some(id) = state.download_id else {
            debug!("no active download to monitor");
            return;
        };
        state.update_tasks.retain(|task| !task.is_finished());
        let inner = Arc::clone(self);
        state.update_tasks.push(self.runtime.spawn(async move {
            inner.run_update(id).await;
        }));
    }

    async fn run_update(self: Arc<Self>, id: DownloadId) {
        let queried = self.service.query(id).await;
        if self.on_status(id, queried) {
            let opened = self.service.open_completed(id).await;
            self.on_artifact(id, opened);
        }
    }

    /// Returns true once the download succeeded and the artifact must be checked
    fn on_status(
        self: &Arc<Self>,
        id: DownloadId,
        queried: Result<Option<DownloadStatus>, PlatformError>,
    ) -> bool {
        let guard = self.state.lock();
        {
            let state = guard.borrow();
            if !state.is_current(id) || state.finished {
                return false;
            }
        }

        let status = match queried {
            Ok(Some(status)) => status,
            Ok(None) => {
                self.finish_with_error(Some(id), DownloadError::NotFound { id: id.get() });
                return false;
            }
            Err(e) => {
                self.finish_with_error(
                    Some(id),
                    DownloadError::Service {
                        message: e.to_string(),
                    },
                );
                return false;
            }
        };

        match status.phase {
            DownloadPhase::Pending | DownloadPhase::Running => {
                self.on_progress(id, &status);
                false
            }
            DownloadPhase::Succeeded => {
                // Claim the terminal transition so overlapping polls stand down
                guard.borrow_mut().finished = true;
                true
            }
            DownloadPhase::Failed { reason } => {
                self.finish_with_error(
                    Some(id),
                    DownloadError::TransferFailed {
                        id: id.get(),
                        reason,
                    },
                );
                false
            }
        }
    }

    fn on_progress(self: &Arc<Self>, id: DownloadId, status: &DownloadStatus) {
        let guard = self.state.lock();
        self.emit_download_progress(id.get(), status.bytes_so_far, status.bytes_total);
        if self
            .listener
            .on_progress(status.bytes_so_far, status.bytes_total)
        {
            self.schedule_poll(id);
        }
        drop(guard);
    }

    fn schedule_poll(self: &Arc<Self>, id: DownloadId) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.is_current(id) || state.finished {
            return;
        }
        state.poll_generation += 1;
        let generation = state.poll_generation;
        if let Some(previous) = state.poll_task.take() {
            previous.abort();
        }
        let inner = Arc::clone(self);
        let interval = self.settings.progress_interval;
        state.poll_task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            inner.on_poll_due(id, generation);
        }));
    }

    fn on_poll_due(self: &Arc<Self>, id: DownloadId, generation: u64) {
        let guard = self.state.lock();
        let due = {
            let state = guard.borrow();
            state.poll_generation == generation && state.is_current(id)
        };
        if due {
            self.update();
        }
        drop(guard);
    }

    fn on_artifact(
        self: &Arc<Self>,
        id: DownloadId,
        opened: Result<Option<LocalArtifact>, PlatformError>,
    ) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if !state.is_current(id) {
                return;
            }
            if let Some(task) = state.poll_task.take() {
                task.abort();
            }
            if let Some(task) = state.watchdog_task.take() {
                task.abort();
            }
        }

        let expected = self.artifact.size;
        let checked = match opened {
            Err(e) => Err(DownloadError::SizeCheckFailed {
                message: e.to_string(),
            }),
            Ok(None) => Err(DownloadError::ArtifactMissing { id: id.get() }),
            Ok(Some(artifact)) if artifact.size != expected => {
                Err(DownloadError::InvalidArtifact {
                    expected,
                    actual: artifact.size,
                })
            }
            Ok(Some(artifact)) => Ok(artifact),
        };

        match checked {
            Ok(artifact) => {
                debug!(id = %id, path = %artifact.path.display(), "Download was successful");
                self.emit(AppEvent::Download(DownloadEvent::Completed {
                    id: id.get(),
                    path: artifact.path.clone(),
                    size: artifact.size,
                }));
                self.listener.on_complete(artifact);
            }
            Err(error) => self.finish_with_error(Some(id), error),
        }
        drop(guard);
    }

    /// Deliver the terminal error of the attempt and clean up after it
    fn finish_with_error(&self, id: Option<DownloadId>, error: DownloadError) {
        let guard = self.state.lock();
        let release = {
            let mut state = guard.borrow_mut();
            state.finished = true;
            state.abort_monitoring();
            match id {
                Some(id) if state.download_id == Some(id) => state.download_id.take(),
                _ => None,
            }
        };
        if let Some(id) = release {
            self.clear_persisted();
            self.spawn_remove(id);
        }

        match id {
            Some(id) => error!(id = %id, error = %error, "Failed to download update"),
            None => error!(error = %error, "Failed to request update download"),
        }
        self.emit_download_failed(id.map(DownloadId::get), FailureContext::from_error(&error));
        self.listener.on_error(error);
        drop(guard);
    }

    fn cancel(&self) {
        let guard = self.state.lock();
        let active = {
            let mut state = guard.borrow_mut();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            state.abort_monitoring();
            // The request task is left to run: an acceptance racing this call
            // sees the flag and removes the new download itself.
            state.download_id.take()
        };
        info!("release download cancelled");
        if let Some(id) = active {
            self.clear_persisted();
            self.spawn_remove(id);
        }
        drop(guard);
    }

    fn discard(&self) {
        let guard = self.state.lock();
        let active = {
            let mut state = guard.borrow_mut();
            state.finished = true;
            state.abort_monitoring();
            state.download_id.take()
        };
        if let Some(id) = active {
            debug!(id = %id, "discarding downloaded release");
            self.clear_persisted();
            self.spawn_remove(id);
        }
        drop(guard);
    }

    fn is_current(&self, id: DownloadId) -> bool {
        self.state.lock().borrow().is_current(id)
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.handle.clear() {
            warn!(error = %e, "failed to clear persisted download id");
            self.emit_warning_with_context("Failed to forget the finished download", e.to_string());
        }
    }

    fn spawn_remove(&self, id: DownloadId) {
        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            match service.remove(id).await {
                Ok(()) => {
                    debug!(id = %id, "Removed download");
                    events.emit(AppEvent::Download(DownloadEvent::Removed { id: id.get() }));
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "failed to remove download");
                    events.emit_warning_with_context(
                        format!("Failed to remove download {id}"),
                        e.to_string(),
                    );
                }
            }
        });
    }
}
