//! relup - Release download and install orchestrator
//!
//! This is the CLI front end. It wires the desktop collaborators into the
//! operations context and drives one command through the ops crate.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod setup;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::setup::SystemSetup;
use clap::Parser;
use relup_config::Config;
use relup_events::EventReceiver;
use relup_ops::{OperationResult, OpsContextBuilder, OpsCtx, ReleaseUpdater};
use relup_types::{ColorChoice, ReleaseArtifact, UpdatePhase, Version};
use std::path::PathBuf;
use std::process;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting relup v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: file (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command)?;

    let setup = SystemSetup::new(config.clone());
    setup.initialize().await?;

    let (event_sender, event_receiver) = relup_events::channel();
    let ctx = OpsContextBuilder::new()
        .with_platform(setup.platform().await?)
        .with_event_sender(event_sender)
        .with_config(config.clone())
        .build()?;

    let color = cli.global.color.unwrap_or(config.general.color);
    let renderer = OutputRenderer::new(cli.global.json, color);
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, cli.global.json);

    let result =
        execute_command_with_events(cli.command, ctx, event_receiver, &mut event_handler).await?;

    renderer.render_result(&result)?;

    if let OperationResult::UpdateReport(report) = &result {
        if let Some(failed) = CliError::from_report(report) {
            warn!(phase = %report.phase, "update did not succeed");
            return Err(failed);
        }
    }

    info!(success = result.is_success(), "Command completed");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: OpsCtx,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(&event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: OpsCtx) -> Result<OperationResult, CliError> {
    match command {
        Commands::Update {
            url,
            size,
            version,
            mandatory,
            ..
        } => {
            let version = Version::parse(&version).map_err(|e| {
                CliError::InvalidArguments(format!("invalid version '{version}': {e}"))
            })?;
            let artifact = ReleaseArtifact::new(url, size, version).mandatory(mandatory);
            let report = update(&ctx, artifact).await?;
            Ok(OperationResult::UpdateReport(report))
        }

        Commands::Status => {
            let report = relup_ops::status(&ctx).await?;
            Ok(OperationResult::DownloadStatus(report))
        }

        Commands::Cancel => {
            let message = match relup_ops::cancel(&ctx).await? {
                Some(id) => format!("Removed download {id}"),
                None => "No download to cancel".to_string(),
            };
            Ok(OperationResult::Success(message))
        }
    }
}

/// Drive one release to the end, cancelling on Ctrl-C
async fn update(ctx: &OpsCtx, artifact: ReleaseArtifact) -> Result<relup_ops::UpdateReport, CliError> {
    let mandatory = artifact.mandatory;
    let updater = ReleaseUpdater::new(ctx, artifact, None)?;

    let interrupt = {
        let updater = updater.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling update");
                updater.cancel();
            }
        })
    };

    // The user is in front of the terminal, so an optional release is
    // monitored as soon as the service accepts it.
    let foreground = (!mandatory).then(|| {
        let updater = updater.clone();
        let mut phases = updater.subscribe();
        tokio::spawn(async move {
            let reached = phases
                .wait_for(|phase| *phase != UpdatePhase::Idle && *phase != UpdatePhase::Requesting)
                .await
                .map(|phase| *phase);
            if matches!(reached, Ok(UpdatePhase::Downloading)) {
                updater.resume();
            }
        })
    });

    let result = updater.run().await;
    interrupt.abort();
    if let Some(task) = foreground {
        task.abort();
    }
    Ok(result?)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &cli::GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(color) = &global.color {
        config.general.color = *color;
    }

    if let Commands::Update {
        pending_timeout: Some(secs),
        ..
    } = command
    {
        config.download.pending_timeout_secs = *secs;
    }

    // Flags go through the same checks as file and environment values
    config.validate()?;
    Ok(())
}

fn log_dir() -> PathBuf {
    std::env::temp_dir().join("relup").join("logs")
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let debug_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info,relup=debug,relup_ops=debug,relup_download=debug")
        })
    };

    if debug_enabled {
        // Structured JSON logs to a file keep stderr readable
        let dir = log_dir();
        let log_file = dir.join(format!(
            "relup-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));
        let file = std::fs::create_dir_all(&dir).and_then(|()| std::fs::File::create(&log_file));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(debug_filter())
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) if !json_mode => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(debug_filter())
                    .init();
                return;
            }
            Err(_) => {}
        }
    }

    if json_mode {
        // Nothing may contaminate the JSON on stdout
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,relup=warn,relup_ops=warn")
                }),
            )
            .init();
    }
}
