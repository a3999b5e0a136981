//! Scriptable in-memory collaborators

use async_trait::async_trait;
use parking_lot::Mutex;
use relup_errors::PlatformError;
use relup_types::{
    ConfirmationIntent, DownloadId, DownloadPhase, DownloadStatus, InstallSessionId,
    InstallStatus, LocalArtifact,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::download::DownloadService;
use crate::installer::{InstallSession, InstallerService, OutcomeToken};

fn download_failed(operation: &str, message: impl Into<String>) -> PlatformError {
    PlatformError::DownloadServiceFailed {
        operation: operation.to_string(),
        message: message.into(),
    }
}

fn installer_failed(operation: &str, message: impl Into<String>) -> PlatformError {
    PlatformError::InstallerServiceFailed {
        operation: operation.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Default)]
struct MockDownload {
    url: String,
    /// Statuses returned by successive queries; the last one repeats
    statuses: VecDeque<DownloadStatus>,
    artifact: Option<LocalArtifact>,
    open_error: Option<String>,
    queries: usize,
}

impl MockDownload {
    fn current(&self) -> DownloadStatus {
        self.statuses
            .front()
            .cloned()
            .unwrap_or_else(DownloadStatus::pending)
    }
}

#[derive(Debug, Default)]
struct MockDownloadState {
    next_id: i64,
    downloads: HashMap<DownloadId, MockDownload>,
    submitted: Vec<String>,
    removed: Vec<DownloadId>,
    submit_error: Option<String>,
    submit_delay: Option<Duration>,
}

/// Download service whose statuses are scripted by the test
#[derive(Debug, Clone, Default)]
pub struct MockDownloadService {
    inner: Arc<Mutex<MockDownloadState>>,
}

impl MockDownloadService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `submit` fail
    pub fn fail_submit(&self, message: impl Into<String>) {
        self.inner.lock().submit_error = Some(message.into());
    }

    /// Delay acceptance of every subsequent `submit`
    pub fn set_submit_delay(&self, delay: Duration) {
        self.inner.lock().submit_delay = Some(delay);
    }

    /// Register a download as if it survived from a previous run
    pub fn insert_existing(&self, id: DownloadId, status: DownloadStatus) {
        let mut state = self.inner.lock();
        state.next_id = state.next_id.max(id.get() + 1);
        state.downloads.insert(
            id,
            MockDownload {
                url: String::from("recovered"),
                statuses: VecDeque::from([status]),
                ..MockDownload::default()
            },
        );
    }

    /// Queue statuses returned by successive queries of `id`
    pub fn script(&self, id: DownloadId, statuses: impl IntoIterator<Item = DownloadStatus>) {
        if let Some(download) = self.inner.lock().downloads.get_mut(&id) {
            download.statuses = statuses.into_iter().collect();
        }
    }

    /// Replace the status of `id`
    pub fn set_status(&self, id: DownloadId, status: DownloadStatus) {
        self.script(id, [status]);
    }

    /// Set what `open_completed` resolves to
    pub fn set_artifact(&self, id: DownloadId, artifact: Option<LocalArtifact>) {
        if let Some(download) = self.inner.lock().downloads.get_mut(&id) {
            download.artifact = artifact;
        }
    }

    /// Make `open_completed` fail for `id`
    pub fn fail_open(&self, id: DownloadId, message: impl Into<String>) {
        if let Some(download) = self.inner.lock().downloads.get_mut(&id) {
            download.open_error = Some(message.into());
        }
    }

    /// Drop `id` without recording a removal, as if the service lost it
    pub fn forget(&self, id: DownloadId) {
        self.inner.lock().downloads.remove(&id);
    }

    #[must_use]
    pub fn submitted(&self) -> Vec<String> {
        self.inner.lock().submitted.clone()
    }

    #[must_use]
    pub fn removed(&self) -> Vec<DownloadId> {
        self.inner.lock().removed.clone()
    }

    #[must_use]
    pub fn contains(&self, id: DownloadId) -> bool {
        self.inner.lock().downloads.contains_key(&id)
    }

    #[must_use]
    pub fn query_count(&self, id: DownloadId) -> usize {
        self.inner
            .lock()
            .downloads
            .get(&id)
            .map_or(0, |download| download.queries)
    }

    /// Identifier the next accepted request will receive
    #[must_use]
    pub fn next_id(&self) -> DownloadId {
        DownloadId::new(self.inner.lock().next_id)
    }
}

#[async_trait]
impl DownloadService for MockDownloadService {
    async fn submit(&self, url: &str) -> Result<DownloadId, PlatformError> {
        let delay = {
            let mut state = self.inner.lock();
            state.submitted.push(url.to_string());
            if let Some(message) = state.submit_error.clone() {
                return Err(download_failed("submit", message));
            }
            state.submit_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.inner.lock();
        let id = DownloadId::new(state.next_id);
        state.next_id += 1;
        state.downloads.insert(
            id,
            MockDownload {
                url: url.to_string(),
                statuses: VecDeque::from([DownloadStatus::pending()]),
                ..MockDownload::default()
            },
        );
        Ok(id)
    }

    async fn query(&self, id: DownloadId) -> Result<Option<DownloadStatus>, PlatformError> {
        let mut state = self.inner.lock();
        let Some(download) = state.downloads.get_mut(&id) else {
            return Ok(None);
        };
        download.queries += 1;
        let status = if download.statuses.len() > 1 {
            download.statuses.pop_front()
        } else {
            download.statuses.front().cloned()
        };
        Ok(Some(status.unwrap_or_else(DownloadStatus::pending)))
    }

    async fn is_pending(&self, id: DownloadId) -> Result<bool, PlatformError> {
        let state = self.inner.lock();
        Ok(state
            .downloads
            .get(&id)
            .is_some_and(|download| download.current().phase == DownloadPhase::Pending))
    }

    async fn remove(&self, id: DownloadId) -> Result<(), PlatformError> {
        let mut state = self.inner.lock();
        state.downloads.remove(&id);
        state.removed.push(id);
        Ok(())
    }

    async fn open_completed(&self, id: DownloadId) -> Result<Option<LocalArtifact>, PlatformError> {
        let state = self.inner.lock();
        let Some(download) = state.downloads.get(&id) else {
            return Ok(None);
        };
        if let Some(message) = &download.open_error {
            return Err(download_failed("open_completed", message.clone()));
        }
        tracing::trace!(id = %id, url = %download.url, "mock open_completed");
        Ok(download.artifact.clone())
    }
}

/// What a mock installer session saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Option<InstallSessionId>,
    pub stream: Option<String>,
    pub bytes: Vec<u8>,
    pub writes: usize,
    pub fsynced: bool,
    pub committed: bool,
    pub abandoned: bool,
    pub closed: bool,
}

#[derive(Debug, Default)]
struct MockInstallerState {
    next_session: u32,
    sessions: Vec<SessionRecord>,
    open_error: Option<String>,
    /// Fail the write with this index (0-based)
    fail_write_at: Option<usize>,
    commit_error: Option<String>,
    outcome: Option<(InstallStatus, Option<String>, bool)>,
}

/// Installer service recording every session it hands out
#[derive(Debug, Clone, Default)]
pub struct MockInstallerService {
    inner: Arc<Mutex<MockInstallerState>>,
}

impl MockInstallerService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, message: impl Into<String>) {
        self.inner.lock().open_error = Some(message.into());
    }

    pub fn fail_write_at(&self, index: usize) {
        self.inner.lock().fail_write_at = Some(index);
    }

    pub fn fail_commit(&self, message: impl Into<String>) {
        self.inner.lock().commit_error = Some(message.into());
    }

    /// Deliver `status` through the outcome token as soon as a session commits.
    /// With `with_intent`, a confirmation intent for the session is attached.
    pub fn deliver_on_commit(&self, status: InstallStatus, message: Option<String>, with_intent: bool) {
        self.inner.lock().outcome = Some((status, message, with_intent));
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.inner.lock().sessions.clone()
    }
}

#[async_trait]
impl InstallerService for MockInstallerService {
    async fn open_session(&self) -> Result<Box<dyn InstallSession>, PlatformError> {
        let mut state = self.inner.lock();
        if let Some(message) = state.open_error.clone() {
            return Err(installer_failed("open_session", message));
        }
        state.next_session += 1;
        let id = InstallSessionId::new(state.next_session);
        state.sessions.push(SessionRecord {
            id: Some(id),
            ..SessionRecord::default()
        });
        Ok(Box::new(MockInstallSession {
            id,
            index: state.sessions.len() - 1,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockInstallSession {
    id: InstallSessionId,
    index: usize,
    inner: Arc<Mutex<MockInstallerState>>,
}

#[async_trait]
impl InstallSession for MockInstallSession {
    fn id(&self) -> InstallSessionId {
        self.id
    }

    async fn write(&mut self, stream: &str, offset: u64, bytes: &[u8]) -> Result<(), PlatformError> {
        let mut state = self.inner.lock();
        let fail_at = state.fail_write_at;
        let record = &mut state.sessions[self.index];
        if fail_at == Some(record.writes) {
            return Err(installer_failed("write", "injected write failure"));
        }
        if offset != record.bytes.len() as u64 {
            return Err(installer_failed("write", format!("unexpected offset {offset}")));
        }
        record.stream = Some(stream.to_string());
        record.bytes.extend_from_slice(bytes);
        record.writes += 1;
        Ok(())
    }

    async fn fsync(&mut self, _stream: &str) -> Result<(), PlatformError> {
        self.inner.lock().sessions[self.index].fsynced = true;
        Ok(())
    }

    async fn commit(&mut self, token: OutcomeToken) -> Result<(), PlatformError> {
        let outcome = {
            let mut state = self.inner.lock();
            if let Some(message) = state.commit_error.clone() {
                return Err(installer_failed("commit", message));
            }
            state.sessions[self.index].committed = true;
            state.outcome.clone()
        };
        if let Some((status, message, with_intent)) = outcome {
            let intent = with_intent.then(|| ConfirmationIntent {
                session: self.id,
                token: format!("confirm-{}", self.id),
                prompt: None,
            });
            token.deliver(status, message, intent);
        }
        Ok(())
    }

    async fn abandon(&mut self) -> Result<(), PlatformError> {
        self.inner.lock().sessions[self.index].abandoned = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PlatformError> {
        self.inner.lock().sessions[self.index].closed = true;
        Ok(())
    }
}
