//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::Term;
use relup_ops::{DownloadReport, OperationResult, UpdateReport};
use relup_types::ColorChoice;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    /// Render as formatted table
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::DownloadStatus(report) => self.render_download_status(report),
            OperationResult::UpdateReport(report) => self.render_update_report(report),
            OperationResult::Success(message) => self.term.write_line(message),
        }
    }

    fn render_download_status(&self, report: &DownloadReport) -> io::Result<()> {
        let Some(id) = report.id else {
            return self.term.write_line("No download in progress");
        };

        let mut table = self.table();
        table.set_header(vec!["Download", "Phase", "Progress"]);
        let (phase, progress) = match &report.status {
            Some(status) => (
                format!("{:?}", status.phase),
                match status.progress_percent() {
                    Some(percent) => format!("{percent:.0}%"),
                    None => format!("{} bytes", status.bytes_so_far),
                },
            ),
            None => ("unknown to the service".to_string(), "-".to_string()),
        };
        table.add_row(vec![Cell::new(id), Cell::new(phase), Cell::new(progress)]);
        self.term.write_line(&table.to_string())
    }

    fn render_update_report(&self, report: &UpdateReport) -> io::Result<()> {
        let icon = if report.is_success() { "[OK]" } else { "[ERROR]" };
        self.term
            .write_line(&format!("{icon} Release {} {}", report.version, report.phase))?;

        let mut table = self.table();
        if let Some(session) = report.session {
            table.add_row(vec![Cell::new("Session"), Cell::new(session)]);
        }
        if let Some(intent) = &report.confirmation {
            table.add_row(vec![Cell::new("Confirmation"), Cell::new(&intent.token)]);
        }
        if let Some(failure) = &report.failure {
            table.add_row(vec![Cell::new("Failure"), Cell::new(&failure.message)]);
            if let Some(code) = &failure.code {
                table.add_row(vec![Cell::new("Code"), Cell::new(code)]);
            }
        }
        if report.relaunch_requested {
            table.add_row(vec![Cell::new("Relaunch"), Cell::new("requested")]);
        }
        if table.row_count() > 0 {
            self.term.write_line(&table.to_string())?;
        }
        Ok(())
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if matches!(self.color_choice, ColorChoice::Never) {
            table.force_no_tty();
        }
        table
    }
}
