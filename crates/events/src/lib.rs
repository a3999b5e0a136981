#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in relup
//!
//! Every stage of an update reports what it is doing through [`AppEvent`]s
//! sent over an unbounded channel. Library crates never print; the CLI drains
//! the receiver, renders user notices and forwards each event to `tracing`.

pub mod meta;
pub use meta::EventSource;

pub mod events;
pub use events::{
    AppEvent, DownloadEvent, FailureContext, GeneralEvent, InstallEvent, UpdateEvent,
};

use chrono::{DateTime, Utc};
use relup_types::{ConfirmationIntent, UpdatePhase};
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout relup
///
/// Works the same whether you hold a raw `EventSender` or a struct that
/// optionally contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit a download started event
    fn emit_download_started(&self, id: i64, url: impl Into<String>, enqueued_at: DateTime<Utc>) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            id,
            url: url.into(),
            enqueued_at,
        }));
    }

    /// Emit a download progress event
    fn emit_download_progress(&self, id: i64, bytes_so_far: u64, bytes_total: Option<u64>) {
        self.emit(AppEvent::Download(DownloadEvent::Progress {
            id,
            bytes_so_far,
            bytes_total,
        }));
    }

    /// Emit a download failure event
    fn emit_download_failed(&self, id: Option<i64>, failure: FailureContext) {
        self.emit(AppEvent::Download(DownloadEvent::Failed { id, failure }));
    }

    /// Emit a confirmation prompt for the UI collaborator
    fn emit_confirmation_required(&self, intent: ConfirmationIntent) {
        self.emit(AppEvent::Install(InstallEvent::ConfirmationRequired {
            intent,
        }));
    }

    /// Emit the generic install failure notice
    fn emit_install_failed(&self, session: Option<u32>, code: Option<i32>, failure: FailureContext) {
        self.emit(AppEvent::Install(InstallEvent::Failed {
            session,
            code,
            failure,
        }));
    }

    /// Emit an update phase transition
    fn emit_phase_changed(&self, version: impl Into<String>, from: UpdatePhase, to: UpdatePhase) {
        self.emit(AppEvent::Update(UpdateEvent::PhaseChanged {
            version: version.into(),
            from,
            to,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
