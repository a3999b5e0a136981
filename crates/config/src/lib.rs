#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for relup
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/relup/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod sections;

pub use sections::{DownloadConfig, GeneralConfig, InstallConfig, PathConfig, SourcesConfig};

use relup_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("relup").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject values the updater cannot run with
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.install.buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "install.buffer_capacity".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.install.stream_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "install.stream_name".to_string(),
                value: String::new(),
            }
            .into());
        }
        if self.download.pending_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.pending_timeout_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.download.progress_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.progress_interval_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // RELUP_PENDING_TIMEOUT
        if let Ok(timeout) = std::env::var("RELUP_PENDING_TIMEOUT") {
            self.download.pending_timeout_secs =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "RELUP_PENDING_TIMEOUT".to_string(),
                    value: timeout,
                })?;
        }

        // RELUP_PROGRESS_INTERVAL
        if let Ok(interval) = std::env::var("RELUP_PROGRESS_INTERVAL") {
            self.download.progress_interval_ms =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "RELUP_PROGRESS_INTERVAL".to_string(),
                    value: interval,
                })?;
        }

        // RELUP_DOWNLOADS_DIR
        if let Ok(dir) = std::env::var("RELUP_DOWNLOADS_DIR") {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "RELUP_DOWNLOADS_DIR".to_string(),
                    value: dir,
                }
                .into());
            }
            self.paths.downloads_dir = Some(PathBuf::from(dir));
        }

        self.validate()
    }

    /// Base directory for relup's own data
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("relup")
    }

    /// Get the key-value state file path (with default)
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.paths
            .state_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("state.json"))
    }

    /// Get the downloads directory (with default)
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.paths
            .downloads_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("downloads"))
    }

    /// Get the installer staging directory (with default)
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.paths
            .staging_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("staging"))
    }

    /// Get the directory committed packages are placed in (with default)
    #[must_use]
    pub fn install_dir(&self) -> PathBuf {
        self.paths
            .install_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("installed"))
    }
}
