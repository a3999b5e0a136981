//! Install-source detection

use parking_lot::Mutex;
use relup_config::SourcesConfig;
use relup_platform::InstallSourceProbe;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Who placed the running application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// The host does not know, e.g. a manual install
    Unknown,
    /// The application updated itself in an earlier run
    SelfUpdate,
    /// A local installer that does not manage updates
    Local { installer: String },
    /// A store that delivers updates itself
    Store { installer: String },
}

impl InstallSource {
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Installer identifier, if one was reported
    #[must_use]
    pub fn installer(&self) -> Option<&str> {
        match self {
            Self::Local { installer } | Self::Store { installer } => Some(installer),
            Self::Unknown | Self::SelfUpdate => None,
        }
    }
}

/// Decides whether self-updates are allowed for this installation.
///
/// The probe is consulted once and the answer cached until [`reset`](Self::reset).
pub struct InstallSourceDetector {
    probe: Arc<dyn InstallSourceProbe>,
    local_stores: BTreeSet<String>,
    cached: Mutex<Option<InstallSource>>,
}

impl std::fmt::Debug for InstallSourceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallSourceDetector")
            .field("local_stores", &self.local_stores)
            .field("cached", &*self.cached.lock())
            .finish_non_exhaustive()
    }
}

impl InstallSourceDetector {
    pub fn new<I, S>(probe: Arc<dyn InstallSourceProbe>, local_stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            probe,
            local_stores: local_stores.into_iter().map(Into::into).collect(),
            cached: Mutex::new(None),
        }
    }

    /// Detector using the configured local store set
    pub fn from_config(probe: Arc<dyn InstallSourceProbe>, config: &SourcesConfig) -> Self {
        Self::new(probe, config.all_local_stores())
    }

    /// Classify the installation, probing only on the first call
    pub fn detect(&self) -> InstallSource {
        let mut cached = self.cached.lock();
        if let Some(source) = cached.as_ref() {
            return source.clone();
        }
        let source = self.classify();
        debug!(?source, "detected install source");
        *cached = Some(source.clone());
        source
    }

    #[must_use]
    pub fn is_installed_from_store(&self) -> bool {
        self.detect().is_store()
    }

    /// Forget the cached answer so the next call probes again
    pub fn reset(&self) {
        *self.cached.lock() = None;
    }

    fn classify(&self) -> InstallSource {
        let Some(installer) = self.probe.installer_package_name() else {
            return InstallSource::Unknown;
        };
        if installer == self.probe.own_package_name() {
            InstallSource::SelfUpdate
        } else if self.local_stores.contains(&installer) {
            InstallSource::Local { installer }
        } else {
            InstallSource::Store { installer }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relup_platform::StaticSourceProbe;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
        installer: Mutex<Option<String>>,
    }

    impl InstallSourceProbe for CountingProbe {
        fn installer_package_name(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.installer.lock().clone()
        }

        fn own_package_name(&self) -> String {
            "com.example.app".to_string()
        }
    }

    fn detector(installer: Option<&str>) -> InstallSourceDetector {
        let probe = StaticSourceProbe::new(installer.map(String::from), "com.example.app");
        InstallSourceDetector::new(Arc::new(probe), ["com.android.packageinstaller"])
    }

    #[test]
    fn test_classification() {
        assert_eq!(detector(None).detect(), InstallSource::Unknown);
        assert_eq!(
            detector(Some("com.example.app")).detect(),
            InstallSource::SelfUpdate
        );
        assert!(!detector(Some("com.android.packageinstaller")).is_installed_from_store());
        assert!(detector(Some("com.android.vending")).is_installed_from_store());
    }

    #[test]
    fn test_memoized_until_reset() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
            installer: Mutex::new(None),
        });
        let shared: Arc<dyn InstallSourceProbe> = Arc::clone(&probe) as Arc<dyn InstallSourceProbe>;
        let detector = InstallSourceDetector::new(shared, Vec::<String>::new());

        assert_eq!(detector.detect(), InstallSource::Unknown);
        *probe.installer.lock() = Some("com.android.vending".into());
        assert_eq!(detector.detect(), InstallSource::Unknown);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        detector.reset();
        assert!(detector.is_installed_from_store());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }
}
