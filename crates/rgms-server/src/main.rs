//! RGMS - grading and merit ledger service for the MSU-SND ROTC unit.
//!
//! `rgms serve` runs the admin HTTP API (the default when no subcommand is
//! given); `rgms sync-merits` runs the lifetime merit reconciliation once as a
//! management command and prints the report.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rgms_core::ledger::{self, SyncScope};
use rgms_core::{Config, Store};
use rgms_server::api::{self, AppState};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "rgms.log";

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API (default if no subcommand)
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Recompute merit/demerit totals from the log and fix any drift
    SyncMerits {
        /// Only reconcile this cadet
        #[arg(long)]
        cadet: Option<i64>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "rgms")]
#[command(about = "ROTC grading and merit ledger service", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (defaults to ~/.config/rgms/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Initialize the tracing subscriber for logging.
/// The returned guard must live as long as file logging is needed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let data_dir = config.data_dir()?;
    let store = Store::open(&data_dir)
        .with_context(|| format!("Failed to open record store at {}", data_dir.display()))?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(store, bind.unwrap_or(config.bind_addr)).await,
        Commands::SyncMerits { cadet } => sync_merits(&store, cadet),
    }
}

async fn serve(store: Store, bind_addr: String) -> Result<()> {
    info!(data_dir = %store.data_dir().display(), "RGMS starting");

    // The admin front end is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(AppState::new(store)).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("RGMS shutting down");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolve once `signal` fires. If the handler can't be installed this
/// never resolves, leaving the server up until the process is killed.
async fn wait_for_shutdown(signal: impl Future<Output = io::Result<()>>) {
    if let Err(e) = signal.await {
        warn!(error = %e, "Failed to listen for shutdown signal, running until killed");
        std::future::pending::<()>().await;
    }
}

fn sync_merits(store: &Store, cadet: Option<i64>) -> Result<()> {
    let scope = cadet.map(SyncScope::Cadet).unwrap_or(SyncScope::AllCadets);
    let report = ledger::sync_lifetime_merits(store, scope).context("Merit sync failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!(
        "Corrected merit totals for {} of {} cadets",
        report.synced_count, report.total_cadets
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_on_signal() {
        wait_for_shutdown(async { Ok::<(), io::Error>(()) }).await;
    }

    #[tokio::test]
    async fn test_failed_signal_handler_keeps_server_up() {
        let failed = async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) };
        let waited =
            tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(failed)).await;
        assert!(waited.is_err(), "shutdown should wait forever");
    }
}
