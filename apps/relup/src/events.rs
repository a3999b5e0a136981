//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{Style, Term};
use relup_events::{AppEvent, DownloadEvent, GeneralEvent, InstallEvent, UpdateEvent};

/// Turns events into user feedback on stderr
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppress human output, e.g. in JSON mode
    quiet: bool,
    term: Term,
    last_percent: Option<u64>,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
            term: Term::stderr(),
            last_percent: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: &AppEvent) {
        log_event_with_tracing(event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => match context {
                Some(context) => self.show_warning(&format!("{message}: {context}")),
                None => self.show_warning(message),
            },
            AppEvent::Download(DownloadEvent::Requested { url, version }) => {
                self.show_status(&format!("Requesting release {version} from {url}"));
            }
            AppEvent::Download(DownloadEvent::Started { id, .. }) => {
                self.show_status(&format!("Download {id} accepted"));
            }
            AppEvent::Download(DownloadEvent::Progress {
                bytes_so_far,
                bytes_total: Some(total),
                ..
            }) if *total > 0 => {
                let percent = bytes_so_far.saturating_mul(100) / total;
                if self.last_percent != Some(percent) {
                    self.last_percent = Some(percent);
                    self.show_progress(&format!("Downloading... {percent}%"));
                }
            }
            AppEvent::Download(DownloadEvent::Completed { size, .. }) => {
                self.show_success(&format!("Downloaded {size} bytes"));
            }
            AppEvent::Download(DownloadEvent::Failed { failure, .. }) => {
                self.show_error(&failure.message, failure.hint.as_deref());
            }
            AppEvent::Install(InstallEvent::Committed { session }) => {
                self.show_status(&format!("Installing release (session {session})"));
            }
            AppEvent::Install(InstallEvent::ConfirmationRequired { intent }) => {
                let prompt = intent
                    .prompt
                    .as_deref()
                    .unwrap_or("The installer needs your confirmation to continue");
                self.show_warning(&format!("{prompt} (token {})", intent.token));
            }
            AppEvent::Install(InstallEvent::Succeeded { .. }) => {
                self.show_success("Release installed");
            }
            AppEvent::Install(InstallEvent::Failed { failure, .. }) => {
                self.show_error(&failure.message, failure.hint.as_deref());
            }
            AppEvent::Install(InstallEvent::RelaunchRequested) => {
                self.show_warning("Restart the application to use the new release");
            }
            AppEvent::Update(UpdateEvent::Skipped { reason, .. }) => {
                self.show_warning(reason);
            }
            AppEvent::Update(UpdateEvent::Cancelled { version }) => {
                self.show_warning(&format!("Update to {version} cancelled"));
            }
            AppEvent::Update(UpdateEvent::PhaseChanged { from, to, .. }) if self.debug_enabled => {
                self.show_status(&format!("{from} -> {to}"));
            }
            _ => {}
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.colors_enabled {
            style
        } else {
            Style::new()
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self
            .term
            .write_line(&self.style(Style::new().cyan()).apply_to(message).to_string());
    }

    fn show_progress(&self, message: &str) {
        let _ = self.term.clear_line();
        let _ = self.term.write_str(message);
    }

    fn show_success(&self, message: &str) {
        let _ = self.term.clear_line();
        let _ = self
            .term
            .write_line(&self.style(Style::new().green()).apply_to(message).to_string());
    }

    fn show_warning(&self, message: &str) {
        let _ = self
            .term
            .write_line(&self.style(Style::new().yellow()).apply_to(message).to_string());
    }

    fn show_error(&self, message: &str, hint: Option<&str>) {
        let _ = self.term.clear_line();
        let _ = self
            .term
            .write_line(&self.style(Style::new().red().bold()).apply_to(message).to_string());
        if let Some(hint) = hint {
            let _ = self.term.write_line(&format!("  Hint: {hint}"));
        }
    }
}
