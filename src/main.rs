//! Gauge Monitoring Service - Main Daemon
//!
//! A long-running daemon that continuously:
//! 1. Fetches the current gauge list for the configured stations
//! 2. Compares each water level with the station's HW100 value
//! 3. Logs a warning for every station at or above HW100
//! 4. Picks up edits to the station config without a restart
//!
//! Usage:
//!   cargo run --release -- debug    # Foreground, debug-level logging
//!   cargo run --release -- run      # Service mode (systemd or similar)
//!
//! Environment:
//!   PEGELMON_SETTINGS - settings file path (default: pegelmon.toml)
//!   RUST_LOG          - log filter, overrides the settings file

use clap::{Parser, Subcommand};
use pegelmon_service::daemon::StopSignal;
use pegelmon_service::ingest::pegel::PegelClient;
use pegelmon_service::logging;
use pegelmon_service::service::Service;
use pegelmon_service::settings::{DEFAULT_SETTINGS_PATH, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pegelmon_service")]
#[command(about = "River gauge water level monitoring with HW100 warnings")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Settings file
    #[arg(long, env = "PEGELMON_SETTINGS", default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Station config file, overrides the settings file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in the foreground with debug logging
    Debug,
    /// Run as a managed service; stops on SIGTERM or Ctrl+C
    Run,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = match Settings::load(&cli.settings) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.config {
        settings.service.config_path = path;
    }

    match cli.command {
        Command::Debug => logging::init("debug"),
        Command::Run => logging::init(&settings.service.log_level),
    }
    info!(version = env!("CARGO_PKG_VERSION"), "pegelmon_service starting");

    let source = match PegelClient::new(settings.fetch_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let stop = StopSignal::new();
    spawn_signal_listener(stop.clone());

    let mut service = match Service::start(&settings, source, stop) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = service.wait() {
        error!(error = %e, "pegelmon_service terminated abnormally");
        return ExitCode::FAILURE;
    }
    info!("pegelmon_service stopped");
    ExitCode::SUCCESS
}

/// Sets `stop` on Ctrl+C or, on Unix, SIGTERM from the service manager.
fn spawn_signal_listener(stop: StopSignal) {
    let spawned = thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "signal handling unavailable");
                    return;
                }
            };

            runtime.block_on(wait_for_shutdown());
            info!("shutdown requested");
            stop.stop();
        });

    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn signal listener");
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
