//! Configuration sections

use crate::constants;
use relup_types::ColorChoice;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
        }
    }
}

/// Download stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DownloadConfig {
    #[must_use]
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }

    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            pending_timeout_secs: constants::PENDING_TIMEOUT_SECS,
            progress_interval_ms: constants::PROGRESS_INTERVAL_MS,
            request_timeout_secs: 300, // 5 minutes
        }
    }
}

/// Installer session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_stream_name")]
    pub stream_name: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: constants::INSTALL_BUFFER_CAPACITY,
            stream_name: constants::INSTALL_STREAM_NAME.to_string(),
        }
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub state_file: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
}

/// Install-source detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Installers that count as local (sideload) sources
    #[serde(default = "default_local_stores")]
    pub local_stores: Vec<String>,
    /// Appended to `local_stores` without replacing the defaults
    #[serde(default)]
    pub extra_local_stores: Vec<String>,
    /// Installer that placed the running application, if known
    pub installer: Option<String>,
    /// Package name of the running application
    #[serde(default = "default_package_name")]
    pub package_name: String,
}

impl SourcesConfig {
    /// Combined local store set
    #[must_use]
    pub fn all_local_stores(&self) -> Vec<String> {
        let mut stores = self.local_stores.clone();
        for extra in &self.extra_local_stores {
            if !stores.contains(extra) {
                stores.push(extra.clone());
            }
        }
        stores
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            local_stores: default_local_stores(),
            extra_local_stores: Vec::new(),
            installer: None,
            package_name: default_package_name(),
        }
    }
}

// Default value functions for serde
fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_pending_timeout_secs() -> u64 {
    constants::PENDING_TIMEOUT_SECS
}

fn default_progress_interval_ms() -> u64 {
    constants::PROGRESS_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_buffer_capacity() -> usize {
    constants::INSTALL_BUFFER_CAPACITY
}

fn default_stream_name() -> String {
    constants::INSTALL_STREAM_NAME.to_string()
}

fn default_local_stores() -> Vec<String> {
    constants::DEFAULT_LOCAL_STORES
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_package_name() -> String {
    "relup".to_string()
}
