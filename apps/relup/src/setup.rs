//! Wiring of the desktop collaborators

use crate::error::CliError;
use relup_config::Config;
use relup_net::{HttpDownloadService, NetClient, NetConfig};
use relup_platform::{Platform, StagingInstaller, StaticSourceProbe};
use relup_state::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Prepares directories and builds the collaborators from configuration
pub struct SystemSetup {
    config: Config,
}

impl SystemSetup {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create every directory the collaborators write to
    pub async fn initialize(&self) -> Result<(), CliError> {
        info!("Initializing relup");
        for dir in [
            self.config.data_dir(),
            self.config.downloads_dir(),
            self.config.staging_dir(),
            self.config.install_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                CliError::Setup(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        debug!(state_file = %self.config.state_file().display(), "directories ready");
        Ok(())
    }

    /// Build the HTTP download service, staging installer and JSON store
    pub async fn platform(&self) -> Result<Platform, CliError> {
        let net_config = NetConfig {
            timeout: Duration::from_secs(self.config.download.request_timeout_secs),
            ..NetConfig::default()
        };
        let client = NetClient::new(net_config).map_err(relup_errors::Error::from)?;
        let downloads = HttpDownloadService::open(client, self.config.downloads_dir())
            .await
            .map_err(relup_errors::Error::from)?;
        let store = JsonFileStore::open(self.config.state_file()).map_err(relup_errors::Error::from)?;
        let installer =
            StagingInstaller::new(self.config.staging_dir(), self.config.install_dir());
        let source = StaticSourceProbe::new(
            self.config.sources.installer.clone(),
            self.config.sources.package_name.clone(),
        );

        Ok(Platform::new(
            Arc::new(downloads),
            Arc::new(installer),
            Arc::new(store),
            Arc::new(source),
        ))
    }
}
