//! record-server - TCP record store with subscribe/notify fan-out
//!
//! # Usage
//!
//! ```bash
//! record-server                 # listens on 0.0.0.0:8080
//! record-server -p 9000 -v      # port 9000, debug logging
//! ```
//!
//! Exits with status 2 when the port is already in use.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use record_relay::store::MemoryStore;
use record_relay::{Error, RecordServer, ServerConfig};

/// Record server with observer notifications
#[derive(Parser, Debug)]
#[command(name = "record-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short = 'p', long = "port", default_value_t = 8080)]
    port: u16,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

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

    let config = ServerConfig::with_addr(SocketAddr::new(cli.host, cli.port))
        .max_connections(cli.max_connections);
    let server = RecordServer::new(config, Arc::new(MemoryStore::new()));

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match server.run_until(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::AddrInUse(_)) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
