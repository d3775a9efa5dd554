//! Stop Routes
//!
//! - GET /stops - Stops of the configured transport

use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

use crate::server::state::ServerState;

/// GET /stops
///
/// Serves the body serialized at startup.
pub async fn list_stops(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], state.stops_json.clone())
}
