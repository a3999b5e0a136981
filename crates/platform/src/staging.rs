//! Installer service that stages packages in a directory and places them on commit
//!
//! Each session owns `<staging>/session-<id>/`. Streams are plain files in that
//! directory. Committing moves the single written stream to
//! `<install_dir>/<stream>.pkg` with a rename and reports success through the
//! outcome token. A session dropped without commit removes its directory.

use async_trait::async_trait;
use relup_errors::PlatformError;
use relup_types::{InstallSessionId, InstallStatus};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::installer::{InstallSession, InstallerService, OutcomeToken};

fn failed(operation: &str, err: impl std::fmt::Display) -> PlatformError {
    PlatformError::InstallerServiceFailed {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

/// Directory-backed installer service
#[derive(Debug)]
pub struct StagingInstaller {
    staging_dir: PathBuf,
    install_dir: PathBuf,
    next_session: AtomicU32,
}

impl StagingInstaller {
    #[must_use]
    pub fn new(staging_dir: impl Into<PathBuf>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            install_dir: install_dir.into(),
            next_session: AtomicU32::new(1),
        }
    }

    /// Directory committed packages are placed in
    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }
}

#[async_trait]
impl InstallerService for StagingInstaller {
    async fn open_session(&self) -> Result<Box<dyn InstallSession>, PlatformError> {
        let id = InstallSessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        let dir = self.staging_dir.join(format!("session-{id}"));
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| failed("open_session", e))?;
        fs::create_dir_all(&self.install_dir)
            .await
            .map_err(|e| failed("open_session", e))?;
        tracing::debug!(session = %id, dir = %dir.display(), "opened staging session");
        Ok(Box::new(StagingSession {
            id,
            dir,
            install_dir: self.install_dir.clone(),
            streams: HashMap::new(),
            finished: false,
        }))
    }
}

struct StagingSession {
    id: InstallSessionId,
    dir: PathBuf,
    install_dir: PathBuf,
    streams: HashMap<String, File>,
    finished: bool,
}

impl StagingSession {
    fn ensure_open(&self, operation: &str) -> Result<(), PlatformError> {
        if self.finished {
            return Err(failed(operation, format!("session {} is closed", self.id)));
        }
        Ok(())
    }

    async fn stream(&mut self, name: &str) -> Result<&mut File, PlatformError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(failed("write", format!("invalid stream name {name:?}")));
        }
        if !self.streams.contains_key(name) {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(self.dir.join(name))
                .await
                .map_err(|e| failed("write", e))?;
            self.streams.insert(name.to_string(), file);
        }
        self.streams
            .get_mut(name)
            .ok_or_else(|| failed("write", format!("stream {name} unavailable")))
    }
}

#[async_trait]
impl InstallSession for StagingSession {
    fn id(&self) -> InstallSessionId {
        self.id
    }

    async fn write(&mut self, stream: &str, offset: u64, bytes: &[u8]) -> Result<(), PlatformError> {
        self.ensure_open("write")?;
        let file = self.stream(stream).await?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| failed("write", e))?;
        file.write_all(bytes).await.map_err(|e| failed("write", e))
    }

    async fn fsync(&mut self, stream: &str) -> Result<(), PlatformError> {
        self.ensure_open("fsync")?;
        let file = self
            .streams
            .get_mut(stream)
            .ok_or_else(|| failed("fsync", format!("stream {stream} was never written")))?;
        file.flush().await.map_err(|e| failed("fsync", e))?;
        file.sync_all().await.map_err(|e| failed("fsync", e))
    }

    async fn commit(&mut self, token: OutcomeToken) -> Result<(), PlatformError> {
        self.ensure_open("commit")?;
        let mut names: Vec<String> = self.streams.keys().cloned().collect();
        if names.len() != 1 {
            self.finished = true;
            token.deliver(
                InstallStatus::FAILURE_INVALID,
                Some(format!("expected one package stream, found {}", names.len())),
                None,
            );
            return Ok(());
        }
        let name = names.remove(0);
        // Close the handle before moving the file
        if let Some(file) = self.streams.remove(&name) {
            file.sync_all().await.map_err(|e| failed("commit", e))?;
        }
        let target = self.install_dir.join(format!("{name}.pkg"));
        fs::rename(self.dir.join(&name), &target)
            .await
            .map_err(|e| failed("commit", e))?;
        self.finished = true;
        tracing::info!(session = %self.id, target = %target.display(), "package placed");
        token.deliver(InstallStatus::SUCCESS, None, None);
        Ok(())
    }

    async fn abandon(&mut self) -> Result<(), PlatformError> {
        self.streams.clear();
        self.finished = true;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(failed("abandon", e)),
        }
    }

    async fn close(&mut self) -> Result<(), PlatformError> {
        self.streams.clear();
        self.finished = true;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(failed("close", e)),
        }
    }
}

impl Drop for StagingSession {
    fn drop(&mut self) {
        // Best-effort cleanup for sessions nobody closed
        if self.dir.exists() {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
