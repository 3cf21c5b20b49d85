//! Gateway binary entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::config::loader::load_config;
use edge_gateway::config::watcher::ConfigWatcher;
use edge_gateway::{GatewayConfig, GatewayServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", version, about = "Resilience-focused API gateway")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            tracing::warn!("No config file given, starting with defaults and no routes");
            GatewayConfig::default()
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => edge_gateway::observability::metrics::init_metrics(addr),
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    // Hot reload only makes sense with a file to watch. The handle must
    // stay alive for the watcher thread to keep running.
    let (config_rx, _watcher_handle) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (rx, Some(handle)),
                Err(e) => {
                    tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                    (tokio::sync::mpsc::unbounded_channel().1, None)
                }
            }
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let shutdown = Arc::new(Shutdown::new());
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal_shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install shutdown signal handler");
            }
        }
    });

    let server = GatewayServer::new(config);
    server.run(listener, config_rx, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
