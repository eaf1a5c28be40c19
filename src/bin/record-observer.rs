//! record-observer - print every record stored on a record server
//!
//! # Usage
//!
//! ```bash
//! record-observer
//! record-observer -s 10.0.0.5 -p 9000 -o updates.json --retry-delay 5
//! ```
//!
//! Updates are appended to the output file, one pretty-printed JSON document
//! per update. The observer reconnects after the server goes away.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use record_relay::client::{machine_uuid, ClientConfig, ObserverClient, ObserverEvent};
use record_relay::Record;

/// Record server observer
#[derive(Parser, Debug)]
#[command(name = "record-observer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server host
    #[arg(short = 's', long = "server", default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short = 'p', long = "port", default_value_t = 8080)]
    port: u16,

    /// Append updates to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = 30)]
    retry_delay: u64,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let config = ClientConfig::new(cli.host, cli.port)
        .retry_delay(Duration::from_secs(cli.retry_delay));
    let (observer, mut events) = ObserverClient::new(config, machine_uuid());

    let observer_task = tokio::spawn(async move { observer.run().await });

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ObserverEvent::Connected) => tracing::info!("Subscribed"),
                Some(ObserverEvent::Update(record)) => {
                    if let Err(e) = emit(&record, cli.output.as_deref()) {
                        eprintln!("Error: {e:#}");
                    }
                }
                Some(ObserverEvent::Disconnected(reason)) => {
                    tracing::info!(reason = %reason, retry_secs = cli.retry_delay, "Disconnected");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    observer_task.abort();
    ExitCode::SUCCESS
}

/// Pretty-print to stdout, or append to `output`
fn emit(record: &Record, output: Option<&Path>) -> Result<()> {
    let pretty = serde_json::to_string_pretty(record)?;
    tracing::debug!(id = ?record.id(), "Update received");

    match output {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            writeln!(file, "{pretty}")
                .with_context(|| format!("failed to append to {}", path.display()))?;
        }
        None => println!("{pretty}"),
    }

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_new(level).map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
