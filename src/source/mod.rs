//! Live Data Source
//!
//! Fetches vehicle positions and stops for the map view. Both operations are
//! idempotent queries that hand back an immutable snapshot with every record
//! whose coordinates are not finite already removed.
//!
//! - [`DataSource`]: the seam the session talks to
//! - [`HttpDataSource`]: the HTTP implementation against the vehicles/stops endpoints

mod http;
mod validate;

pub use http::HttpDataSource;
pub use validate::retain_finite;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DecodeError, StopPosition, VehiclePosition};

/// Validated result of one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// Surviving records, in server order
    pub records: Vec<T>,
    /// Records discarded for non-finite coordinates
    pub dropped: usize,
}

impl<T> Fetched<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Provider of live map data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch vehicle positions, restricted to one line when `filter` is non-empty
    async fn fetch_vehicles(
        &self,
        filter: Option<&str>,
    ) -> Result<Fetched<VehiclePosition>, FetchError>;

    /// Fetch all stops
    async fn fetch_stops(&self) -> Result<Fetched<StopPosition>, FetchError>;
}

/// Errors that can occur while fetching map data
#[derive(Error, Debug)]
pub enum FetchError {
    /// Endpoint answered with a non-success status
    #[error("Network response was not ok (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Data source unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FetchError {
    /// Transport-level failure or a non-success status
    pub fn is_network(&self) -> bool {
        !matches!(self, FetchError::Decode(_))
    }

    /// HTTP status for [`FetchError::Status`]
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Treat empty filter text as "no filter"; anything else is passed verbatim
pub fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    filter.filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filter() {
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("")), None);
        assert_eq!(normalize_filter(Some("5")), Some("5"));
        assert_eq!(normalize_filter(Some(" 5 ")), Some(" 5 "));
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Network response was not ok (HTTP 500): boom"
        );
        assert_eq!(err.status(), Some(500));
        assert!(err.is_network());
        assert!(FetchError::Timeout.is_network());
    }
}
