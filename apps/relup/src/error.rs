//! CLI error handling

use std::fmt;

use relup_errors::UserFacingError;
use relup_events::FailureContext;
use relup_ops::UpdateReport;
use relup_types::UpdatePhase;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration file, environment or flag rejected
    Config(relup_errors::ConfigError),
    /// Operation could not run
    Ops(relup_errors::Error),
    /// Directories or collaborators could not be prepared
    Setup(String),
    /// Invalid command arguments
    InvalidArguments(String),
    /// The update ran but did not install the release
    UpdateFailed {
        version: String,
        phase: UpdatePhase,
        failure: Option<FailureContext>,
    },
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Error for an update report that did not end in success
    pub fn from_report(report: &UpdateReport) -> Option<Self> {
        (!report.is_success()).then(|| CliError::UpdateFailed {
            version: report.version.clone(),
            phase: report.phase,
            failure: report.failure.clone(),
        })
    }

    /// Process exit code; a finished but unsuccessful update is told apart
    /// from a command that could not run
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UpdateFailed { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {e}")?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Setup(msg) => write!(f, "System setup error: {msg}"),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::UpdateFailed {
                version,
                phase,
                failure,
            } => {
                write!(f, "Update to {version} {phase}")?;
                if let Some(failure) = failure {
                    write!(f, ": {}", failure.message)?;
                    if let Some(code) = &failure.code {
                        write!(f, "\n  Code: {code}")?;
                    }
                    if let Some(hint) = &failure.hint {
                        write!(f, "\n  Hint: {hint}")?;
                    }
                    if failure.retryable {
                        write!(f, "\n  Retry: run the update again.")?;
                    }
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<relup_errors::ConfigError> for CliError {
    fn from(e: relup_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<relup_errors::Error> for CliError {
    fn from(e: relup_errors::Error) -> Self {
        match e {
            relup_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Ops(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
