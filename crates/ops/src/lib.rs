#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release update orchestration for relup
//!
//! This crate sits between the CLI and the stage crates. The
//! [`ReleaseUpdater`] drives one release from download request to installer
//! outcome; the small operations inspect or drop a download left behind by
//! an earlier run.

mod context;
mod small_ops;
mod types;
mod updater;

pub use context::{OpsContextBuilder, OpsCtx};
pub use small_ops::{cancel, status};
pub use types::{DownloadReport, UpdateReport};
pub use updater::ReleaseUpdater;

use relup_errors::Error;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// State of the persisted download
    DownloadStatus(DownloadReport),
    /// Result of an update attempt
    UpdateReport(UpdateReport),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("failed to serialize result: {e}")))
    }

    /// Check if this is a success result
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::DownloadStatus(_) | OperationResult::Success(_) => true,
            OperationResult::UpdateReport(report) => report.is_success(),
        }
    }
}
