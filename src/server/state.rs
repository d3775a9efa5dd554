//! Server State
//!
//! Shared state accessible by all handlers.

use axum::body::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ServerConfig;

use super::error::ApiError;
use super::stops::{load_stops, StopRecord, StopsError};

#[derive(Debug, Clone)]
pub struct ServerState {
    /// Client for the upstream GPS feed
    pub client: reqwest::Client,
    pub config: Arc<ServerConfig>,
    /// Stops, parsed once at startup
    pub stops: Arc<Vec<StopRecord>>,
    /// `stops` as the JSON body of `/stops`
    pub stops_json: Bytes,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig, stops: Vec<StopRecord>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.upstream_timeout_ms))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let stops_json = serde_json::to_vec(&stops)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize stops: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            stops: Arc::new(stops),
            stops_json: Bytes::from(stops_json),
            start_time: Instant::now(),
        })
    }

    /// Build state, loading the configured stops file.
    ///
    /// A missing stops file is not fatal: `/stops` then serves an empty list.
    pub async fn load(config: ServerConfig) -> Result<Self, ApiError> {
        let path = Path::new(&config.stops_file);

        let stops = match load_stops(path, &config.stops_transport).await {
            Ok(stops) => {
                tracing::info!(count = stops.len(), file = %path.display(), "Loaded stops");
                stops
            }
            Err(StopsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %path.display(), "Stops file not found, serving no stops");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Self::new(config, stops)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
