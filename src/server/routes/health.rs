//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::server::dto::HealthResponse;
use crate::server::state::ServerState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// The upstream feed is not probed; it is only reported as configured.
pub async fn full_health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let stops_loaded = state.stops.len();

    Json(HealthResponse {
        status: if stops_loaded > 0 { "healthy" } else { "degraded" }.to_string(),
        stops_loaded,
        upstream: state.config.upstream_gps_url.clone(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
