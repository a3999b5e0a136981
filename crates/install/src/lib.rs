#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Release installation for relup
//!
//! This crate streams a downloaded release into an installer session,
//! interprets the asynchronous outcome the installer reports back and
//! decides whether the running application may update itself at all.

mod outcome;
mod session;
mod source;

pub use outcome::{OutcomeAction, OutcomeHandler};
pub use session::{PackageInstaller, SessionSettings};
pub use source::{InstallSource, InstallSourceDetector};

// Re-export EventSender for callers wiring events through the installer
pub use relup_events::EventSender;
