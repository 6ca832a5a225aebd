//! Pebble Server
//!
//! HTTP service that authenticates device owners and ingests telemetry.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pebble_core::config::load_config;
use pebble_core::tracing_init::init_tracing;
use pebble_server::oracle::RpcOwnershipOracle;
use pebble_server::routes::{AppState, build_router};
use pebble_server::service::DeviceService;
use pebble_server::storage::PebbleDatabase;

#[derive(Parser, Debug)]
#[command(name = "pebble-server")]
#[command(version, about = "Pebble server - device ownership and telemetry ingestion")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "PEBBLE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides `server.listen_addr`.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file. Overrides `server.database_path`.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Blockchain JSON-RPC endpoint. Overrides `chain.rpc_endpoint`.
    #[arg(long)]
    rpc_endpoint: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(endpoint) = args.rpc_endpoint {
        config.chain.rpc_endpoint = endpoint;
    }
    if args.log_json {
        config.log.json = true;
    }
    config.validate()?;

    init_tracing(&config.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting pebble-server"
    );

    let db_path = config
        .server
        .database_path_or_default()
        .context("Cannot determine data directory for the database")?;
    info!(path = %db_path.display(), "Opening pebble database");
    let db = PebbleDatabase::open(&db_path).await?;

    let oracle = Arc::new(RpcOwnershipOracle::new(&config.chain)?);
    info!(endpoint = %config.chain.rpc_endpoint, "Ownership oracle configured");

    let app = build_router(AppState {
        service: DeviceService::new(db, oracle),
        max_body_bytes: config.server.max_body_bytes,
    });

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Pebble server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
