//! Download service fetching artifacts over HTTP into a local directory
//!
//! Layout of the downloads directory, per download id `N`:
//! - `N.url`: the requested URL, written on submit
//! - `N.part`: bytes received so far
//! - `N.artifact`: the finished file, renamed from `N.part`
//!
//! Reopening the service over an existing directory registers finished
//! artifacts as succeeded and restarts interrupted transfers, so a download
//! identifier stays valid across process restarts.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use relup_errors::PlatformError;
use relup_platform::DownloadService;
use relup_types::{DownloadId, DownloadPhase, DownloadStatus, LocalArtifact};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::client::NetClient;

fn service_failed(operation: &str, message: impl Into<String>) -> PlatformError {
    PlatformError::DownloadServiceFailed {
        operation: operation.to_string(),
        message: message.into(),
    }
}

struct Entry {
    url: String,
    status: DownloadStatus,
    task: Option<JoinHandle<()>>,
}

type Registry = Arc<DashMap<DownloadId, Entry>>;

/// HTTP-backed [`DownloadService`]
pub struct HttpDownloadService {
    client: NetClient,
    dir: PathBuf,
    next_id: AtomicI64,
    downloads: Registry,
}

impl std::fmt::Debug for HttpDownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDownloadService")
            .field("dir", &self.dir)
            .field("downloads", &self.downloads.len())
            .finish_non_exhaustive()
    }
}

impl HttpDownloadService {
    /// Open the service over `dir`, recovering downloads from a previous run
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or scanned.
    pub async fn open(client: NetClient, dir: impl Into<PathBuf>) -> Result<Self, PlatformError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| service_failed("open", format!("{}: {e}", dir.display())))?;

        let service = Self {
            client,
            dir,
            next_id: AtomicI64::new(1),
            downloads: Arc::new(DashMap::new()),
        };
        service.recover().await?;
        Ok(service)
    }

    /// Directory holding partial and finished downloads
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: DownloadId, extension: &str) -> PathBuf {
        self.dir.join(format!("{id}.{extension}"))
    }

    async fn recover(&self) -> Result<(), PlatformError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| service_failed("open", e.to_string()))?;
        let mut highest = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| service_failed("open", e.to_string()))?
        {
            let path = entry.path();
            let Some(raw) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<i64>().ok())
            else {
                continue;
            };
            if raw < 0 || path.extension().and_then(|e| e.to_str()) != Some("url") {
                continue;
            }
            highest = highest.max(raw);
            let id = DownloadId::new(raw);
            let url = fs::read_to_string(&path)
                .await
                .map_err(|e| service_failed("open", e.to_string()))?
                .trim()
                .to_string();

            match fs::metadata(self.path(id, "artifact")).await {
                Ok(meta) => {
                    tracing::debug!(id = %id, "recovered finished download");
                    self.downloads.insert(
                        id,
                        Entry {
                            url,
                            status: DownloadStatus::succeeded(meta.len()),
                            task: None,
                        },
                    );
                }
                Err(_) => {
                    tracing::info!(id = %id, url = %url, "restarting interrupted download");
                    self.start_transfer(id, url);
                }
            }
        }

        self.next_id.store(highest + 1, Ordering::SeqCst);
        Ok(())
    }

    fn start_transfer(&self, id: DownloadId, url: String) {
        self.downloads.insert(
            id,
            Entry {
                url: url.clone(),
                status: DownloadStatus::pending(),
                task: None,
            },
        );

        let task = tokio::spawn(run_transfer(
            self.client.clone(),
            Arc::clone(&self.downloads),
            id,
            url,
            self.path(id, "part"),
            self.path(id, "artifact"),
        ));

        match self.downloads.get_mut(&id) {
            Some(mut entry) => entry.task = Some(task),
            // Removed before we could record the task
            None => task.abort(),
        }
    }
}

fn set_status(downloads: &Registry, id: DownloadId, status: DownloadStatus) -> bool {
    match downloads.get_mut(&id) {
        Some(mut entry) => {
            entry.status = status;
            true
        }
        None => false,
    }
}

async fn run_transfer(
    client: NetClient,
    downloads: Registry,
    id: DownloadId,
    url: String,
    part: PathBuf,
    artifact: PathBuf,
) {
    match transfer(&client, &downloads, id, &url, &part, &artifact).await {
        Ok(size) => {
            tracing::info!(id = %id, size, "download finished");
            set_status(&downloads, id, DownloadStatus::succeeded(size));
        }
        Err(reason) => {
            tracing::warn!(id = %id, url = %url, reason = %reason, "download failed");
            let _ = fs::remove_file(&part).await;
            set_status(&downloads, id, DownloadStatus::failed(reason));
        }
    }
}

async fn transfer(
    client: &NetClient,
    downloads: &Registry,
    id: DownloadId,
    url: &str,
    part: &Path,
    artifact: &Path,
) -> Result<u64, String> {
    let response = client.get(url).await.map_err(|e| e.to_string())?;
    let total = response.content_length();
    if !set_status(downloads, id, DownloadStatus::running(0, total)) {
        return Err("download removed".to_string());
    }

    let mut file = File::create(part).await.map_err(|e| e.to_string())?;
    let mut stream = response.bytes_stream();
    let chunk_timeout = client.config().chunk_timeout;
    let mut received = 0u64;

    loop {
        match tokio::time::timeout(chunk_timeout, stream.next()).await {
            Ok(Some(chunk)) => {
                let chunk = chunk.map_err(|e| e.to_string())?;
                file.write_all(&chunk).await.map_err(|e| e.to_string())?;
                received += chunk.len() as u64;
                if !set_status(downloads, id, DownloadStatus::running(received, total)) {
                    return Err("download removed".to_string());
                }
            }
            Ok(None) => break,
            Err(_) => return Err(format!("timed out waiting for data from {url}")),
        }
    }

    file.flush().await.map_err(|e| e.to_string())?;
    file.sync_all().await.map_err(|e| e.to_string())?;
    drop(file);

    fs::rename(part, artifact)
        .await
        .map_err(|e| e.to_string())?;
    Ok(received)
}

#[async_trait]
impl DownloadService for HttpDownloadService {
    async fn submit(&self, url: &str) -> Result<DownloadId, PlatformError> {
        reqwest::Url::parse(url).map_err(|e| service_failed("submit", format!("{url}: {e}")))?;

        let id = DownloadId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        fs::write(self.path(id, "url"), url)
            .await
            .map_err(|e| service_failed("submit", e.to_string()))?;

        tracing::debug!(id = %id, url = %url, "download accepted");
        self.start_transfer(id, url.to_string());
        Ok(id)
    }

    async fn query(&self, id: DownloadId) -> Result<Option<DownloadStatus>, PlatformError> {
        Ok(self.downloads.get(&id).map(|entry| entry.status.clone()))
    }

    async fn is_pending(&self, id: DownloadId) -> Result<bool, PlatformError> {
        Ok(self
            .downloads
            .get(&id)
            .is_some_and(|entry| entry.status.phase == DownloadPhase::Pending))
    }

    async fn remove(&self, id: DownloadId) -> Result<(), PlatformError> {
        if let Some((_, entry)) = self.downloads.remove(&id) {
            if let Some(task) = entry.task {
                task.abort();
            }
            tracing::debug!(id = %id, url = %entry.url, "download removed");
        }
        for extension in ["part", "artifact", "url"] {
            match fs::remove_file(self.path(id, extension)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(service_failed("remove", e.to_string())),
            }
        }
        Ok(())
    }

    async fn open_completed(&self, id: DownloadId) -> Result<Option<LocalArtifact>, PlatformError> {
        let finished = self
            .downloads
            .get(&id)
            .is_some_and(|entry| entry.status.phase == DownloadPhase::Succeeded);
        if !finished {
            return Ok(None);
        }

        let path = self.path(id, "artifact");
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(LocalArtifact {
                path,
                size: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(service_failed("open_completed", e.to_string())),
        }
    }
}
