//! Transport Map API Server
//!
//! Run with: cargo run --bin transport-map-api
//!
//! # Configuration
//!
//! Read from the standard config locations (see `transport-map config`),
//! or from the file named by `TRANSPORT_MAP_CONFIG`.
//!
//! Environment variables:
//! - `TRANSPORT_MAP_HOST`: Host to bind to (default: 0.0.0.0)
//! - `TRANSPORT_MAP_PORT`: Port to listen on (default: 8082)
//! - `TRANSPORT_MAP_UPSTREAM_URL`: GPS feed URL
//! - `TRANSPORT_MAP_STOPS_FILE`: Stops XML file (default: stops.xml)
//! - `RUST_LOG`: Log filter (default: from config, info)

use anyhow::Context;
use std::path::PathBuf;

use transport_map::config::Config;
use transport_map::server::{serve, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var_os("TRANSPORT_MAP_CONFIG") {
        Some(path) => Config::load_with_env(&PathBuf::from(path))?,
        None => Config::load_default(),
    };

    transport_map::logging::init(&config.logging).context("Failed to initialize logging")?;

    tracing::info!("Starting transport map API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upstream GPS feed: {}", config.server.upstream_gps_url);

    let state = ServerState::load(config.server.clone()).await?;

    serve(state, &config.server).await?;

    tracing::info!("Transport map API server stopped");
    Ok(())
}
