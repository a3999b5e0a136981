//! Operations context for dependency injection

use relup_config::Config;
use relup_errors::Error;
use relup_events::{EventEmitter, EventSender};
use relup_platform::Platform;

/// Operations context providing access to the collaborators and configuration
pub struct OpsCtx {
    /// External collaborators
    pub platform: Platform,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// System configuration
    pub config: Config,
}

impl std::fmt::Debug for OpsCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsCtx")
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Builder for [`OpsCtx`]
#[derive(Default)]
pub struct OpsContextBuilder {
    platform: Option<Platform>,
    tx: Option<EventSender>,
    config: Option<Config>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collaborators
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Set configuration; defaults apply when omitted
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the platform or the event sender is missing.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let platform = self.platform.ok_or_else(|| missing("platform"))?;
        let tx = self.tx.ok_or_else(|| missing("event sender"))?;

        Ok(OpsCtx {
            platform,
            tx,
            config: self.config.unwrap_or_default(),
        })
    }
}

fn missing(component: &str) -> Error {
    Error::internal(format!("operations context is missing the {component}"))
}
