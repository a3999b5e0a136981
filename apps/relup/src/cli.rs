//! Command line interface definition

use clap::{Parser, Subcommand};
use relup_types::ColorChoice;
use std::path::PathBuf;

/// relup - Release download and install orchestrator
#[derive(Parser)]
#[command(name = "relup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download and install application releases")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Download and install a release, resuming an interrupted download
    #[command(alias = "up")]
    Update {
        /// Where the release package is downloaded from
        #[arg(long)]
        url: String,

        /// Expected size of the package in bytes
        #[arg(long)]
        size: u64,

        /// Version carried by the package
        #[arg(long, default_value = "0.0.0")]
        version: String,

        /// Monitor the download as soon as it is accepted
        #[arg(long)]
        mandatory: bool,

        /// Seconds a download may stay pending before it is failed
        #[arg(long, value_name = "SECS")]
        pending_timeout: Option<u64>,
    },

    /// Show the download left behind by an earlier run
    Status,

    /// Remove the download left behind by an earlier run
    Cancel,
}
