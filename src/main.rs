//! edge-gate binary.
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  EDGE GATE                   │
//!   Client Request       │  ┌────────┐   ┌────────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│listener│──▶│ body limit │──▶│ upstream │──┼──▶ Backend
//!                        │  │ (TLS?) │   │  (2 MiB)   │   │ HTTP/1.1 │  │
//!                        │  └────────┘   └─────┬──────┘   └────┬─────┘  │
//!                        │                     │ 400           │        │
//!   Client Response      │               ┌─────▼───────────────▼─────┐  │
//!   ◀────────────────────┼───────────────│ fallback table / relay /  │◀─┼─── Backend
//!                        │               │ 101 byte tunnel           │  │
//!                        │               └───────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_gate::config::{load_with_overrides, Overrides};
use edge_gate::lifecycle::{signals::shutdown_on_signal, Shutdown};
use edge_gate::observability::{logging, metrics};
use edge_gate::{GateError, HttpServer};

#[derive(Parser)]
#[command(name = "edge-gate", version)]
#[command(about = "Single-upstream reverse proxy with body limits and failure translation", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "EDGE_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Listener address, overrides `listener.bind_address`.
    #[arg(long, env = "EDGE_GATE_BIND")]
    bind: Option<String>,

    /// Upstream host:port, overrides `upstream.address`.
    #[arg(long, env = "EDGE_GATE_UPSTREAM")]
    upstream: Option<String>,

    /// Validate the configuration, print it resolved, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        bind_address: cli.bind,
        upstream_address: cli.upstream,
    };
    let config = load_with_overrides(cli.config.as_deref(), &overrides).map_err(GateError::from)?;

    if cli.check {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.observability).map_err(GateError::from)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gate starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        max_body_size = config.limits.max_body_size,
        fallback_statuses = ?config.fallback.statuses(),
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr).map_err(GateError::from)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.serve(shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
