//! Installer outcome handling
//!
//! Every inbound [`InstallerSignal`] goes through [`OutcomeHandler::dispatch`],
//! a pure mapping to an [`OutcomeAction`]. [`OutcomeHandler::handle`] adds the
//! session filter and the side effects (logging and user-facing events).

use parking_lot::Mutex;
use relup_errors::InstallError;
use relup_events::{AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent};
use relup_types::{ConfirmationIntent, InstallOutcome, InstallSessionId, InstallStatus, InstallerSignal};
use tracing::{debug, error, info, warn};

/// What to do in response to an installer signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeAction {
    /// Surface the confirmation prompt; the install is still in progress
    RequestConfirmation(ConfirmationIntent),
    /// The release was installed
    Finished,
    /// Show the generic failure notice; the install is over
    NotifyFailure { code: i32, message: String },
    /// The application was replaced and should be restarted
    Relaunch,
    /// Nothing to do
    Ignore,
}

impl OutcomeAction {
    /// Whether the action ends the install attempt
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::NotifyFailure { .. })
    }

    /// Error describing a failure action, `None` for every other action
    #[must_use]
    pub fn failure(&self) -> Option<InstallError> {
        let Self::NotifyFailure { code, message } = self else {
            return None;
        };
        let error = if InstallStatus(*code).failure_kind().is_some()
            || *code == InstallStatus::PENDING_USER_ACTION.0
        {
            InstallError::OutcomeFailed {
                code: *code,
                message: message.clone(),
            }
        } else {
            InstallError::UnrecognizedStatus { code: *code }
        };
        Some(error)
    }
}

#[derive(Debug, Default)]
struct HandlerState {
    /// Session committed by the current attempt
    session: Option<InstallSessionId>,
    cancelled: bool,
}

/// Routes installer signals for one update attempt
#[derive(Debug, Default)]
pub struct OutcomeHandler {
    state: Mutex<HandlerState>,
    events: Option<EventSender>,
}

impl EventEmitter for OutcomeHandler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl OutcomeHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_event_sender(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Accept status reports for `session` from now on
    pub fn expect_session(&self, session: InstallSessionId) {
        debug!(session = %session, "expecting installer outcome");
        self.state.lock().session = Some(session);
    }

    /// Session whose status reports are currently accepted
    #[must_use]
    pub fn session(&self) -> Option<InstallSessionId> {
        self.state.lock().session
    }

    /// Ignore every signal from now on. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        state.session = None;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Map a signal to its action without any side effect
    #[must_use]
    pub fn dispatch(signal: &InstallerSignal) -> OutcomeAction {
        match signal {
            InstallerSignal::SessionStatus {
                status,
                message,
                confirmation,
                ..
            } => {
                match InstallOutcome::from_status(*status, message.clone(), confirmation.clone()) {
                    InstallOutcome::ConfirmationRequired(intent) => {
                        OutcomeAction::RequestConfirmation(intent)
                    }
                    InstallOutcome::Success => OutcomeAction::Finished,
                    InstallOutcome::Failure { message, .. } => OutcomeAction::NotifyFailure {
                        code: status.0,
                        message,
                    },
                    InstallOutcome::Unrecognized { code, message } => {
                        OutcomeAction::NotifyFailure { code, message }
                    }
                }
            }
            InstallerSignal::PackageReplaced => OutcomeAction::Relaunch,
            InstallerSignal::Other { .. } => OutcomeAction::Ignore,
        }
    }

    /// Act on a signal delivered by the installer service or the host.
    ///
    /// Status reports for any session other than the expected one are
    /// ignored, as is everything after [`cancel`](Self::cancel). A terminal
    /// action stops accepting further reports for the session.
    pub fn handle(&self, signal: InstallerSignal) -> OutcomeAction {
        let session = {
            let mut state = self.state.lock();
            if state.cancelled {
                debug!(?signal, "installer signal after cancellation");
                return OutcomeAction::Ignore;
            }
            match &signal {
                InstallerSignal::SessionStatus { session, .. } => {
                    if state.session != Some(*session) {
                        debug!(session = %session, "status for a session of another attempt");
                        return OutcomeAction::Ignore;
                    }
                    let action = Self::dispatch(&signal);
                    if action.is_terminal() {
                        state.session = None;
                    }
                    Some((*session, action))
                }
                _ => None,
            }
        };

        match session {
            Some((session, action)) => {
                self.apply_status(session, &action);
                action
            }
            None => {
                let action = Self::dispatch(&signal);
                match (&signal, &action) {
                    (_, OutcomeAction::Relaunch) => {
                        info!("application package replaced, requesting relaunch");
                        self.emit(AppEvent::Install(InstallEvent::RelaunchRequested));
                    }
                    (InstallerSignal::Other { action: name }, _) => {
                        debug!(action = %name, "ignoring installer signal");
                        self.emit(AppEvent::Install(InstallEvent::SignalIgnored {
                            action: name.clone(),
                        }));
                    }
                    _ => {}
                }
                action
            }
        }
    }

    fn apply_status(&self, session: InstallSessionId, action: &OutcomeAction) {
        match action {
            OutcomeAction::RequestConfirmation(intent) => {
                info!(session = %session, "installer requires user confirmation");
                self.emit_confirmation_required(intent.clone());
            }
            OutcomeAction::Finished => {
                info!(session = %session, "release installed");
                self.emit(AppEvent::Install(InstallEvent::Succeeded {
                    session: Some(session.get()),
                }));
            }
            OutcomeAction::NotifyFailure { code, message } => {
                let Some(failure) = action.failure() else {
                    return;
                };
                if matches!(failure, InstallError::UnrecognizedStatus { .. }) {
                    warn!(session = %session, code, "unrecognized installer status");
                }
                error!(session = %session, code, message = %message, "Failed to install the new release");
                self.emit_install_failed(
                    Some(session.get()),
                    Some(*code),
                    FailureContext::from_error(&failure),
                );
            }
            OutcomeAction::Relaunch | OutcomeAction::Ignore => {}
        }
    }
}
