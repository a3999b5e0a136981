#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the relup release updater
//!
//! This crate provides the data model shared by every stage of an update:
//! the release artifact being fetched, download identifiers and status
//! snapshots, installer status codes and outcomes, and the orchestrator phase.

pub mod download;
pub mod install;
pub mod release;
pub mod state;

// Re-export commonly used types
pub use download::{DownloadId, DownloadPhase, DownloadStatus, LocalArtifact};
pub use install::{
    ConfirmationIntent, FailureKind, InstallOutcome, InstallSessionId, InstallStatus,
    InstallerSignal,
};
pub use release::ReleaseArtifact;
pub use semver::Version;
pub use state::{TerminalState, UpdatePhase};

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
