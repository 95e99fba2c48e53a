//! Edge dispatcher (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                   EDGE DISPATCHER                     │
//!                          │                                                       │
//!  GET /ui/orders/items    │  ┌─────────┐   ┌───────────┐   ┌──────────────────┐  │
//!  ────────────────────────┼─▶│  http   │──▶│  routing  │──▶│    discovery     │  │      ┌──────────┐
//!                          │  │ server  │   │PathRouter │   │ resolver+context │◀─┼─────▶│ registry │
//!                          │  └─────────┘   └───────────┘   └────────┬─────────┘  │      └──────────┘
//!                          │                                         ▼            │
//!                          │                                ┌──────────────────┐  │
//!                          │                                │  load_balancer   │  │
//!                          │                                │   round robin    │  │
//!                          │                                └────────┬─────────┘  │
//!                          │                                         ▼            │
//!  ◀───────────────────────┼──────────── streamed response ─┌──────────────────┐  │      ┌──────────┐
//!                          │                                │  http::forward   │◀─┼─────▶│ backend  │
//!                          │                                └──────────────────┘  │      └──────────┘
//!                          └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_dispatcher::config::{load_config, ConfigWatcher, DispatcherConfig};
use edge_dispatcher::lifecycle::{signals, Shutdown};
use edge_dispatcher::observability::{logging, metrics};
use edge_dispatcher::HttpServer;

#[derive(Parser)]
#[command(name = "edge-dispatcher")]
#[command(about = "HTTP edge gateway dispatching /ui/{service}/ requests to discovered backends", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the static service table when the configuration file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatcherConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("edge-dispatcher v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path_prefix = %config.dispatch.path_prefix,
        app_id = %config.discovery.app_id,
        scope = ?config.load_balancer.scope,
        services = config.services.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher stops delivering updates once dropped, so keep it for the whole run.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
