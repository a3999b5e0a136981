#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release download stages for relup
//!
//! - request: submit the artifact URL once and persist the returned id
//! - monitor: poll status, report progress, verify the finished artifact
//! - watchdog: fail a download that never leaves the pending phase
//! - cancel: tear everything down and remove the download
//!
//! Progress and the terminal result reach the consumer through
//! [`ReleaseListener`]; the same milestones are emitted as events.

mod downloader;
mod handle;
mod listener;

pub use downloader::{DownloadContext, DownloaderSettings, ReleaseDownloader};
pub use handle::DownloadHandleStore;
pub use listener::ReleaseListener;
