//! Fixed defaults shared by the configuration sections

/// Seconds a request may stay pending before the watchdog fails it
pub const PENDING_TIMEOUT_SECS: u64 = 10;

/// Minimum delay between two progress polls
pub const PROGRESS_INTERVAL_MS: u64 = 500;

/// Chunk size used when streaming an artifact into an installer session
pub const INSTALL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Name of the write stream opened inside an installer session
pub const INSTALL_STREAM_NAME: &str = "RelupPackageInstallerStream";

/// Key under which the active download id is persisted
pub const DOWNLOAD_ID_KEY: &str = "relup.download_id";

/// Installer identifiers that denote a sideload rather than a store install
pub const DEFAULT_LOCAL_STORES: &[&str] = &[
    "adb",
    "com.android.packageinstaller",
    "com.google.android.packageinstaller",
    "com.android.managedprovisioning",
    "com.miui.packageinstaller",
    "com.samsung.android.packageinstaller",
    "pc",
    "com.google.android.apps.nbu.files",
    "org.mozilla.firefox",
    "com.android.chrome",
];
