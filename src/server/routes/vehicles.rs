//! Vehicle Routes
//!
//! - GET /vehicles?bus_number=N - Live vehicle positions, optionally for one line

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::server::dto::VehiclesQuery;
use crate::server::error::{ApiError, ApiResult};
use crate::server::feed::{filter_line, parse_feed, FeedRow};
use crate::server::state::ServerState;

/// GET /vehicles
///
/// Fetches the upstream GPS feed on every request. An upstream error status
/// is passed through to the caller.
pub async fn list_vehicles(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<VehiclesQuery>,
) -> ApiResult<Json<Vec<FeedRow>>> {
    let response = state
        .client
        .get(&state.config.upstream_gps_url)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Upstream {
            status: status.as_u16(),
        });
    }

    let text = response.text().await?;
    let parsed = parse_feed(&text);
    let rows = filter_line(parsed.rows, query.bus_number.as_deref());

    tracing::debug!(
        bus_number = ?query.bus_number,
        count = rows.len(),
        rows_failed = parsed.rows_failed,
        "Served vehicles"
    );

    Ok(Json(rows))
}
