//! Installer session stage

use relup_config::InstallConfig;
use relup_errors::InstallError;
use relup_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use relup_platform::{InstallSession, InstallerService, OutcomeToken, SignalSender};
use relup_types::{InstallSessionId, LocalArtifact};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::outcome::OutcomeHandler;

/// How a package is streamed into a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Chunk size for each session write
    pub buffer_capacity: usize,
    /// Name of the single stream the package is written to
    pub stream_name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&InstallConfig::default())
    }
}

impl From<&InstallConfig> for SessionSettings {
    fn from(config: &InstallConfig) -> Self {
        Self {
            buffer_capacity: config.buffer_capacity.max(1),
            stream_name: config.stream_name.clone(),
        }
    }
}

/// Hands a completed download to the installer service
#[derive(Clone)]
pub struct PackageInstaller {
    service: Arc<dyn InstallerService>,
    settings: SessionSettings,
    events: Option<EventSender>,
}

impl std::fmt::Debug for PackageInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageInstaller")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for PackageInstaller {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl PackageInstaller {
    pub fn new(service: Arc<dyn InstallerService>, settings: SessionSettings) -> Self {
        Self {
            service,
            settings,
            events: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Install `local` on a runtime task.
    ///
    /// The committed session is registered with `outcomes` before the commit,
    /// so a status delivered synchronously by the installer is never dropped.
    pub fn install_package(
        &self,
        local: LocalArtifact,
        signals: SignalSender,
        outcomes: Arc<OutcomeHandler>,
    ) -> JoinHandle<Result<InstallSessionId, InstallError>> {
        let installer = self.clone();
        tokio::spawn(async move { installer.install(&local, signals, &outcomes).await })
    }

    /// Open a session, stream `local` into it and commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened, the artifact cannot be
    /// read, or any session call fails. A session that was opened is abandoned
    /// before the error is returned.
    pub async fn install(
        &self,
        local: &LocalArtifact,
        signals: SignalSender,
        outcomes: &OutcomeHandler,
    ) -> Result<InstallSessionId, InstallError> {
        let mut session =
            self.service
                .open_session()
                .await
                .map_err(|e| InstallError::SessionOpenFailed {
                    message: e.to_string(),
                })?;
        let id = session.id();
        info!(session = %id, path = %local.path.display(), "install session opened");
        self.emit(AppEvent::Install(InstallEvent::SessionOpened {
            session: id.get(),
            path: local.path.display().to_string(),
        }));

        match self
            .stream_and_commit(session.as_mut(), local, signals, outcomes)
            .await
        {
            Ok(()) => {
                if let Err(e) = session.close().await {
                    warn!(session = %id, error = %e, "failed to close install session");
                    self.emit_warning(format!("Install session {id} was not closed cleanly"));
                }
                Ok(id)
            }
            Err(error) => {
                warn!(session = %id, error = %error, "abandoning install session");
                if let Err(e) = session.abandon().await {
                    warn!(session = %id, error = %e, "failed to abandon install session");
                }
                Err(error)
            }
        }
    }

    async fn stream_and_commit(
        &self,
        session: &mut dyn InstallSession,
        local: &LocalArtifact,
        signals: SignalSender,
        outcomes: &OutcomeHandler,
    ) -> Result<(), InstallError> {
        let id = session.id();
        let streamed = self.stream(session, local).await?;
        self.emit(AppEvent::Install(InstallEvent::Streamed {
            session: id.get(),
            bytes: streamed,
        }));

        outcomes.expect_session(id);
        session
            .commit(OutcomeToken::new(id, signals))
            .await
            .map_err(|e| InstallError::CommitFailed {
                session: id.get(),
                message: e.to_string(),
            })?;
        info!(session = %id, bytes = streamed, "install session committed");
        self.emit(AppEvent::Install(InstallEvent::Committed { session: id.get() }));
        Ok(())
    }

    /// Copy the artifact into the session stream and sync it.
    ///
    /// The file is owned by this scope and closed on every return path.
    async fn stream(
        &self,
        session: &mut dyn InstallSession,
        local: &LocalArtifact,
    ) -> Result<u64, InstallError> {
        let id = session.id();
        let stream_failed = |message: String| InstallError::StreamFailed {
            session: id.get(),
            message,
        };

        let mut file = tokio::fs::File::open(&local.path).await.map_err(|e| {
            InstallError::ArtifactUnreadable {
                path: local.path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let stream_name = self.settings.stream_name.as_str();
        let mut buffer = vec![0u8; self.settings.buffer_capacity];
        let mut offset = 0u64;
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| stream_failed(e.to_string()))?;
            if read == 0 {
                break;
            }
            session
                .write(stream_name, offset, &buffer[..read])
                .await
                .map_err(|e| stream_failed(e.to_string()))?;
            offset += read as u64;
        }
        debug!(session = %id, bytes = offset, stream = stream_name, "package streamed");

        session
            .fsync(stream_name)
            .await
            .map_err(|e| stream_failed(e.to_string()))?;
        Ok(offset)
    }
}
