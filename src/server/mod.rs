//! Vehicles/Stops Backend
//!
//! HTTP server the map view fetches from, built with Axum.
//!
//! # Endpoints
//!
//! - `GET /vehicles?bus_number=N` - Live vehicle positions from the upstream GPS feed
//! - `GET /stops` - Stops from the stops XML file
//! - `GET /1`, `GET /2` - Legacy aliases of `/vehicles` and `/stops`
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use transport_map::config::ServerConfig;
//! use transport_map::server::{serve, ServerState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let state = ServerState::load(config.clone()).await?;
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod feed;
pub mod routes;
pub mod state;
pub mod stops;

pub use error::{ApiError, ApiResult};
pub use state::ServerState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;

/// Build the router with all routes and middleware
pub fn build_router(state: ServerState) -> Router {
    let cors = if state.config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    Router::new()
        .route("/vehicles", get(routes::vehicles::list_vehicles))
        .route("/stops", get(routes::stops::list_stops))
        .route("/1", get(routes::vehicles::list_vehicles))
        .route("/2", get(routes::stops::list_stops))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the server and run until a shutdown signal arrives
pub async fn serve(state: ServerState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Transport map API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Transport map API shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
