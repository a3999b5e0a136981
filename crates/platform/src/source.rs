//! Install-source probe seam and a static implementation

/// Answers who installed the running application
pub trait InstallSourceProbe: Send + Sync {
    /// Identifier of the installer that placed the application, if the host knows it
    fn installer_package_name(&self) -> Option<String>;

    /// Package name of the running application
    fn own_package_name(&self) -> String;
}

/// Probe returning fixed values, typically read from configuration
#[derive(Debug, Clone)]
pub struct StaticSourceProbe {
    installer: Option<String>,
    package_name: String,
}

impl StaticSourceProbe {
    #[must_use]
    pub fn new(installer: Option<String>, package_name: impl Into<String>) -> Self {
        Self {
            installer,
            package_name: package_name.into(),
        }
    }
}

impl InstallSourceProbe for StaticSourceProbe {
    fn installer_package_name(&self) -> Option<String> {
        self.installer.clone()
    }

    fn own_package_name(&self) -> String {
        self.package_name.clone()
    }
}
