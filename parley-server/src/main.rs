use anyhow::Context;
use clap::Parser;
use parley_server::config::{Config, StoreBackend};
use parley_server::logging::init_logging;
use parley_server::{SignalingService, server, store};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "parley-server", version, about = "Rendezvous and negotiation relay")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<String>,

    /// Overrides the configured listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep room state in process instead of redis.
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.memory_store {
        config.store.backend = StoreBackend::Memory;
    }

    init_logging(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting {}", config.server.service_name);

    let store = store::connect(&config.store)
        .await
        .context("failed to open the room store")?;
    let service = SignalingService::from_config(&config, store);
    let listener = TcpListener::bind(config.http_address())
        .await
        .with_context(|| format!("failed to bind {}", config.http_address()))?;

    server::serve(listener, service, shutdown_signal()).await?;
    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
