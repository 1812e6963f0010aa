// Clippy configuration: enable pedantic but allow overly strict lints
#![allow(clippy::missing_errors_doc)] // Internal functions don't need # Errors docs
#![allow(clippy::missing_panics_doc)] // Internal functions don't need # Panics docs
#![allow(clippy::must_use_candidate)] // Not all getters need #[must_use]
#![allow(clippy::module_name_repetitions)] // e.g., MarkerStore in geo module is fine
#![allow(clippy::doc_markdown)] // Don't require backticks around JSON, XDG, etc.
#![allow(clippy::too_many_lines)] // Some functions are naturally long
#![allow(clippy::cast_possible_truncation)] // We're careful with our casts
#![allow(clippy::cast_sign_loss)] // Deadline waits are clamped to zero first
#![allow(clippy::single_match_else)] // match with else is fine for Result handling
#![allow(clippy::manual_let_else)] // if-let is clearer for multi-line error handling
#![allow(clippy::needless_pass_by_value)] // PathBuf by value is fine for config loading
#![allow(clippy::float_cmp)] // Coordinates are compared exactly as parsed

//! responder-watch - live agent activity and map markers for emergency-response chat sessions
//!
//! A multi-agent backend emits run/stop markers and free-text answers. This
//! binary turns that stream into "which agent is working now", a history of
//! agent runs, and geolocated map markers pulled from the text.
//!
//! Usage:
//!   responder-watch                      # Listen on the socket (default)
//!   responder-watch push capture.jsonl   # Forward items to a running listener
//!   responder-watch replay capture.jsonl # Offline replay

mod app;
mod cli;
mod config;
mod errors;
mod event;
mod geo;
mod replay;
mod state;

use app::App;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use color_eyre::Result;
use config::WatchConfig;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inbound channel capacity between listener and session
const CHANNEL_CAPACITY: usize = 100;

/// Get the log directory path
fn get_log_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("/tmp/responder-watch/logs"),
        |dirs| dirs.cache_dir().join("responder-watch").join("logs"),
    )
}

/// Print a value as one JSON line on stdout
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!("Failed to serialize output: {}", e),
    }
}

/// Read a whole file, or stdin when no path is given
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that only print to stdout need no logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            cli::print_completions(*shell);
            return Ok(());
        }
        Some(Commands::Config { action }) => {
            match action {
                ConfigAction::Example => print!("{}", WatchConfig::example()),
                ConfigAction::Path => println!("{}", WatchConfig::default_path().display()),
            }
            return Ok(());
        }
        _ => {}
    }

    // Initialize error handling
    color_eyre::install()?;

    // Setup file logging with rotation; stdout carries JSON output
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "responder-watch.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let log_filter = format!("responder_watch={}", cli.log_level);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(non_blocking),
        )
        .init();

    tracing::info!("Starting responder-watch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log directory: {:?}", log_dir);

    let config = WatchConfig::load(cli.config.as_deref());

    match cli.command {
        None | Some(Commands::Listen) => run_listener(&cli.socket, config).await,
        Some(Commands::Push { file }) => push(&cli.socket, file.as_deref()).await,
        Some(Commands::Replay { file, every }) => {
            for view in replay::run(&file, &config, every)? {
                print_json(&view);
            }
            Ok(())
        }
        Some(Commands::Extract { text }) => {
            let text = match text {
                Some(text) => text,
                None => read_input(None)?,
            };
            let extraction = geo::extract(0, &text, config.map.report_invalid_coordinates);
            if extraction.is_empty() {
                tracing::debug!("No markers found in input");
            }
            print_json(&extraction);
            Ok(())
        }
        Some(Commands::Completions { .. } | Commands::Config { .. }) => Ok(()),
    }
}

/// Forward every non-empty line to the listener over one connection
async fn push(socket_path: &Path, file: Option<&Path>) -> Result<()> {
    let input = read_input(file)?;
    let sent = event::socket::send_lines(socket_path, input.lines()).await?;
    tracing::info!(sent, "Pushed lines to {:?}", socket_path);
    Ok(())
}

/// Listen on the socket and print every changed view until Ctrl-C
async fn run_listener(socket_path: &Path, config: WatchConfig) -> Result<()> {
    tracing::debug!("Socket path: {:?}", socket_path);

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    // Spawn socket listener
    let listen_path = socket_path.to_path_buf();
    let listener_config = config.listener.clone();
    let listen_cancel = cancel.clone();
    let socket_handle = tokio::spawn(async move {
        if let Err(e) =
            event::socket::listen(tx, &listen_path, &listener_config, listen_cancel).await
        {
            tracing::error!("Socket listener error: {}", e);
        }
    });

    // Ctrl-C triggers graceful shutdown
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        signal_cancel.cancel();
    });

    let app = app::run(
        App::new(&config),
        rx,
        cancel.clone(),
        print_json::<state::SessionView>,
    )
    .await;

    cancel.cancel();
    if let Err(e) = socket_handle.await {
        tracing::debug!("Socket task ended abnormally: {}", e);
    }
    let _ = std::fs::remove_file(socket_path);

    tracing::info!(
        messages = app.session.messages().len(),
        markers = app.session.markers().len(),
        "Listener stopped"
    );
    Ok(())
}
