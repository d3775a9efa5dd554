//! HTTP Data Source
//!
//! Client for the vehicles and stops endpoints.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::model::{decode_stops, decode_vehicles, StopPosition, VehiclePosition};

use super::{normalize_filter, retain_finite, DataSource, FetchError, Fetched};

/// Data source backed by the vehicles/stops HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    config: SourceConfig,
}

impl HttpDataSource {
    /// Create a new source with the given configuration
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// URL for a vehicles query; an empty filter selects the unfiltered endpoint
    pub fn vehicles_url(&self, filter: Option<&str>) -> String {
        let base = self.endpoint(&self.config.vehicles_path);
        match normalize_filter(filter) {
            Some(line) => format!("{}?bus_number={}", base, urlencoding::encode(line)),
            None => base,
        }
    }

    pub fn stops_url(&self) -> String {
        self.endpoint(&self.config.stops_path)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET a body, checking the status before anything is parsed
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::Unavailable
            } else {
                FetchError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request(e)
            }
        })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_vehicles(
        &self,
        filter: Option<&str>,
    ) -> Result<Fetched<VehiclePosition>, FetchError> {
        let url = self.vehicles_url(filter);
        tracing::debug!(url = %url, "Fetching vehicles");

        let body = self.get_text(&url).await?;
        let fetched = retain_finite(decode_vehicles(&body)?);

        tracing::debug!(
            count = fetched.records.len(),
            dropped = fetched.dropped,
            "Fetched vehicles"
        );
        Ok(fetched)
    }

    async fn fetch_stops(&self) -> Result<Fetched<StopPosition>, FetchError> {
        let url = self.stops_url();
        tracing::debug!(url = %url, "Fetching stops");

        let body = self.get_text(&url).await?;
        let fetched = retain_finite(decode_stops(&body)?);

        tracing::debug!(
            count = fetched.records.len(),
            dropped = fetched.dropped,
            "Fetched stops"
        );
        Ok(fetched)
    }
}
