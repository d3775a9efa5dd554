//! Request and response types

use serde::{Deserialize, Serialize};

/// Query string of `/vehicles`
#[derive(Debug, Default, Deserialize)]
pub struct VehiclesQuery {
    /// Line number, compared verbatim
    pub bus_number: Option<String>,
}

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub stops_loaded: usize,
    pub upstream: String,
    pub uptime_seconds: u64,
    pub version: String,
}
