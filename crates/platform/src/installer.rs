//! Installer service seam and the outcome token handed to it on commit

use async_trait::async_trait;
use relup_errors::PlatformError;
use relup_types::{ConfirmationIntent, InstallSessionId, InstallStatus, InstallerSignal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Sender half of the inbound installer signal channel
pub type SignalSender = UnboundedSender<InstallerSignal>;

/// Receiver half of the inbound installer signal channel
pub type SignalReceiver = UnboundedReceiver<InstallerSignal>;

/// Create a channel for installer signals
#[must_use]
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Re-invokable trigger the installer service uses to report a session's outcome.
///
/// A token may fire several times for one session, e.g. first with a
/// pending-user-action status and later with the final result.
#[derive(Debug, Clone)]
pub struct OutcomeToken {
    session: InstallSessionId,
    sender: SignalSender,
}

impl OutcomeToken {
    #[must_use]
    pub fn new(session: InstallSessionId, sender: SignalSender) -> Self {
        Self { session, sender }
    }

    #[must_use]
    pub fn session(&self) -> InstallSessionId {
        self.session
    }

    /// Deliver a status report. Returns false once nobody listens anymore.
    pub fn deliver(
        &self,
        status: InstallStatus,
        message: Option<String>,
        confirmation: Option<ConfirmationIntent>,
    ) -> bool {
        self.sender
            .send(InstallerSignal::SessionStatus {
                session: self.session,
                status,
                message,
                confirmation,
            })
            .is_ok()
    }
}

/// Package installer service
#[async_trait]
pub trait InstallerService: Send + Sync {
    /// Open a fresh install session
    async fn open_session(&self) -> Result<Box<dyn InstallSession>, PlatformError>;
}

/// An open installer session. Owned by exactly one install attempt.
#[async_trait]
pub trait InstallSession: Send {
    fn id(&self) -> InstallSessionId;

    /// Write `bytes` at `offset` of the named stream
    async fn write(&mut self, stream: &str, offset: u64, bytes: &[u8])
        -> Result<(), PlatformError>;

    /// Flush the named stream to durable storage
    async fn fsync(&mut self, stream: &str) -> Result<(), PlatformError>;

    /// Seal the session; the outcome arrives later through `token`
    async fn commit(&mut self, token: OutcomeToken) -> Result<(), PlatformError>;

    /// Discard everything written and release the session
    async fn abandon(&mut self) -> Result<(), PlatformError>;

    /// Release the session handle
    async fn close(&mut self) -> Result<(), PlatformError>;
}
