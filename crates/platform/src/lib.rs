//! Collaborator seams for the relup update pipeline.
//!
//! The orchestrator talks to its environment only through the traits here:
//! - [`DownloadService`]: background downloads tracked by identifier
//! - [`InstallerService`] / [`InstallSession`]: streamed package installation
//! - [`KeyValueStore`]: durable storage for the active download handle
//! - [`InstallSourceProbe`]: who installed the running application
//!
//! [`StagingInstaller`] is a directory-backed installer; the `mock` feature
//! adds scriptable in-memory collaborators for tests.

pub mod download;
pub mod installer;
#[cfg(feature = "mock")]
pub mod mock;
pub mod services;
pub mod source;
pub mod staging;
pub mod storage;

pub use download::DownloadService;
pub use installer::{
    signal_channel, InstallSession, InstallerService, OutcomeToken, SignalReceiver, SignalSender,
};
pub use services::Platform;
pub use source::{InstallSourceProbe, StaticSourceProbe};
pub use staging::StagingInstaller;
pub use storage::KeyValueStore;
