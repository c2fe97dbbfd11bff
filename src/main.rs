//! confwatch - configuration change watcher
//!
//! Entry point for the confwatch binary.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use confwatch::config::DEFAULT_FILE_NAME;
use confwatch::observability::{init_tracing, TracingConfig};
use confwatch::{ChannelTrigger, Config, ConfigWatcher, ImportParser, Result};
use tokio::signal;
use tokio::sync::broadcast;

/// confwatch - reload configuration when it changes on disk
#[derive(Parser, Debug)]
#[command(name = "confwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root configuration file
    #[arg(short, long, env = "CONFWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Watch the configuration for changes and reload automatically
    #[arg(short, long, env = "CONFWATCH_WATCH")]
    watch: bool,

    /// File looked up in the working directory when --config is not given
    #[arg(long, env = "CONFWATCH_DEFAULT_FILE", default_value = DEFAULT_FILE_NAME)]
    default_file: String,

    /// Quiet window after the first change, in milliseconds
    #[arg(long, env = "CONFWATCH_DEBOUNCE_MS", default_value = "50")]
    debounce_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CONFWATCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "CONFWATCH_LOG_JSON")]
    log_json: bool,

    /// Resolve the import graph once, print it as JSON and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        watch_enabled: cli.watch || cli.check,
        root: cli.config,
        default_file_name: cli.default_file,
        debounce: Duration::from_millis(cli.debounce_ms),
        log_level: cli.log_level,
        log_json: cli.log_json,
    };

    init_tracing(&TracingConfig::from(&config));

    tracing::info!("confwatch v{} starting...", env!("CARGO_PKG_VERSION"));

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    let trigger = ChannelTrigger::default();
    let mut reloads = trigger.subscribe();
    let watcher = ConfigWatcher::new(config, Arc::new(ImportParser::new()), Arc::new(trigger));

    if cli.check {
        watcher.load()?;
        let report = serde_json::to_string_pretty(&watcher.generation())
            .map_err(std::io::Error::from)?;
        println!("{report}");
        return Ok(());
    }

    match watcher.load()? {
        None => {
            tracing::info!("Watching disabled, nothing to do");
            return Ok(());
        }
        Some(input) if input.is_empty() => {
            tracing::warn!("No configuration file found, running with defaults");
        }
        Some(input) => {
            tracing::info!(bytes = input.body().len(), "Configuration loaded");
        }
    }

    run(&watcher, &mut reloads).await?;

    tracing::info!(stats = ?watcher.stats(), "confwatch shut down");
    Ok(())
}

/// Rebuild the configuration on every reload request until shutdown.
async fn run(watcher: &ConfigWatcher, reloads: &mut broadcast::Receiver<()>) -> Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    #[cfg(unix)]
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())?;

    loop {
        #[cfg(unix)]
        let hangup_recv = hangup.recv();
        #[cfg(not(unix))]
        let hangup_recv = std::future::pending::<Option<()>>();

        tokio::select! {
            () = &mut shutdown => break,
            received = reloads.recv() => match received {
                Ok(()) => reload(watcher),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "Coalesced queued reload requests");
                    reload(watcher);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = hangup_recv => {
                tracing::info!("Received SIGHUP, reloading configuration");
                reload(watcher);
            }
        }
    }

    Ok(())
}

fn reload(watcher: &ConfigWatcher) {
    match watcher.load() {
        Ok(Some(input)) => {
            tracing::info!(
                generation = watcher.generation().map(|g| g.number),
                bytes = input.body().len(),
                "Configuration reloaded"
            );
        }
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Configuration reload failed"),
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
