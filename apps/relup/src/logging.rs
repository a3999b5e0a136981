//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! they end up in the same log stream as the library crates' own records.

use relup_events::{AppEvent, DownloadEvent, GeneralEvent, InstallEvent, UpdateEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.event_source();
    let source = source.as_str();

    match event {
        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(source, context = ?context, "{message}");
        }

        AppEvent::Download(download) => match download {
            DownloadEvent::Requested { url, version } => {
                info!(source, url = %url, version = %version, "Download requested");
            }
            DownloadEvent::Started {
                id,
                url,
                enqueued_at,
            } => {
                info!(source, id, url = %url, enqueued_at = %enqueued_at, "Download started");
            }
            DownloadEvent::Resumed { id } => {
                debug!(source, id, "Download monitoring resumed");
            }
            DownloadEvent::Progress {
                id,
                bytes_so_far,
                bytes_total,
            } => {
                debug!(source, id, bytes_so_far, bytes_total = ?bytes_total, "Download progress");
            }
            DownloadEvent::Completed { id, path, size } => {
                info!(source, id, path = %path.display(), size, "Download completed");
            }
            DownloadEvent::Failed { id, failure } => {
                error!(
                    source,
                    id = ?id,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Download failed"
                );
            }
            DownloadEvent::Removed { id } => {
                debug!(source, id, "Download removed");
            }
        },

        AppEvent::Install(install) => match install {
            InstallEvent::SessionOpened { session, path } => {
                info!(source, session, path = %path, "Install session opened");
            }
            InstallEvent::Streamed { session, bytes } => {
                debug!(source, session, bytes, "Package streamed into session");
            }
            InstallEvent::Committed { session } => {
                info!(source, session, "Install session committed");
            }
            InstallEvent::ConfirmationRequired { intent } => {
                info!(source, session = %intent.session, "Installer requires confirmation");
            }
            InstallEvent::Succeeded { session } => {
                info!(source, session = ?session, "Release installed");
            }
            InstallEvent::Failed {
                session,
                code,
                failure,
            } => {
                error!(
                    source,
                    session = ?session,
                    status = ?code,
                    code = ?failure.code,
                    message = %failure.message,
                    "Release installation failed"
                );
            }
            InstallEvent::RelaunchRequested => {
                info!(source, "Relaunch requested");
            }
            InstallEvent::SignalIgnored { action } => {
                debug!(source, action = %action, "Installer signal ignored");
            }
        },

        AppEvent::Update(update) => match update {
            UpdateEvent::PhaseChanged { version, from, to } => {
                info!(source, version = %version, from = %from, to = %to, "Update phase changed");
            }
            UpdateEvent::Skipped { version, reason } => {
                warn!(source, version = %version, reason = %reason, "Update skipped");
            }
            UpdateEvent::Cancelled { version } => {
                warn!(source, version = %version, "Update cancelled");
            }
        },
    }
}
