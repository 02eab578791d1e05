// src/main.rs
use crate::config::AppConfig;
use crate::connectors::stream::ShutdownHandle;
use crate::core::engine::PortfolioClient;
use crate::tui::UiSink;
use crate::types::UiEvent;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod config;
mod connectors;
mod core;
mod error;
#[cfg(test)]
mod test_support;
mod tui;
mod types;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "kraken-portfolio", version, about = "Live USD valuation of a Kraken account")]
struct Cli {
    /// Env file with KRAKEN_API_KEY / KRAKEN_API_SECRET (defaults to ./.env if present)
    #[arg(long = "env")]
    env_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

/// The terminal belongs to the UI, so logs go to a daily file.
fn init_tracing(debug: bool) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "portfolio.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let default_level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    guard
}

fn spawn_signal_listener(shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Termination signal received");
        shutdown.close();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.debug);

    // 1. Configuration & startup (fatal on any failure)
    let config = AppConfig::load(cli.env_file.as_deref()).context("failed to load configuration")?;
    info!("Using REST {} and stream {}", config.rest_url, config.ws_url);

    let mut client = PortfolioClient::new(&config)?;
    println!("Connecting to Kraken...");
    client
        .connect()
        .await
        .context("failed to start portfolio stream")?;

    info!("Tracking {} funded assets", client.holdings().len());
    let shutdown = client.shutdown_handle();
    spawn_signal_listener(shutdown.clone());

    // 2. Stream -> UI channel
    let (ui_tx, ui_rx) = mpsc::channel(64);
    let _ = ui_tx.try_send(UiEvent::Log("Connected to Kraken.".to_string()));
    let _ = ui_tx.try_send(UiEvent::Portfolio(client.valuations()));

    let stream_task = tokio::spawn(async move {
        let outcome = client.stream(UiSink::new(ui_tx.clone())).await;
        if let Err(e) = &outcome {
            let _ = ui_tx.try_send(UiEvent::Log(format!("Stream stopped: {}", e)));
        }
        outcome
    });

    // 3. UI until quit or stream end
    if let Err(e) = tui::run(ui_rx).await {
        error!("UI error: {}", e);
    }
    shutdown.close();

    match stream_task.await? {
        Ok(()) => {
            info!("Stream closed cleanly");
            Ok(())
        }
        Err(e) => {
            error!("Stream terminated: {}", e);
            Err(e).context("price stream failed")
        }
    }
}
