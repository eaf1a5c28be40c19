//! record-client - send one request to a record server
//!
//! # Usage
//!
//! ```bash
//! record-client -i request.json
//! record-client -i request.json -o response.json -s 10.0.0.5 -p 9000 -v
//! ```
//!
//! The request's `UUID` is replaced with this machine's identity.
//!
//! Exit status: 0 on an `OK` response, 1 on an `Error` response or transport
//! failure, 2 when the input file is unusable.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use record_relay::client::{load_request, machine_uuid, ClientConfig, Reply, RequestClient};

/// One-shot record server client
#[derive(Parser, Debug)]
#[command(name = "record-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input JSON file with the request
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Write the response to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Server host
    #[arg(short = 's', long = "server", default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short = 'p', long = "port", default_value_t = 8080)]
    port: u16,

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

    let uuid = machine_uuid();
    let request = match load_request(&cli.input, &uuid).await {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(request = %request, "Request loaded");

    let client = RequestClient::new(ClientConfig::new(cli.host, cli.port));
    let reply = match client.send_value(&request).await {
        Ok(reply) => reply,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = emit(&reply.to_value(), cli.output.as_deref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match reply {
        Reply::Response(response) if response.is_ok() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Pretty-print to stdout, or overwrite `output`
fn emit(value: &Value, output: Option<&Path>) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;

    match output {
        Some(path) => {
            std::fs::write(path, pretty)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Response saved");
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
