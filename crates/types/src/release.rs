//! Release artifact description

use crate::Version;
use serde::{Deserialize, Serialize};

/// Remote update package the caller wants downloaded and installed.
///
/// Supplied once when an updater is built and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseArtifact {
    /// Where the download service fetches the package from
    pub url: String,
    /// Expected byte length of the package
    pub size: u64,
    /// Mandatory updates are monitored eagerly as soon as the request is accepted
    #[serde(default)]
    pub mandatory: bool,
    /// Version carried by the package
    pub version: Version,
}

impl ReleaseArtifact {
    /// Create an optional (non-mandatory) release artifact
    #[must_use]
    pub fn new(url: impl Into<String>, size: u64, version: Version) -> Self {
        Self {
            url: url.into(),
            size,
            mandatory: false,
            version,
        }
    }

    /// Mark the release as mandatory
    #[must_use]
    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Short label used in logs and events, e.g. `1.4.0`
    #[must_use]
    pub fn label(&self) -> String {
        self.version.to_string()
    }
}
