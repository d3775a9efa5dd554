//! Geolocation
//!
//! Single-shot access to the user's position. A location is requested once
//! per session and never retried automatically; every failure is reported as
//! a human-readable message and degrades to "no user marker".

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::model::{Coordinate, UserLocation};

/// Errors reported by a location capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("User denied Geolocation")]
    PermissionDenied,

    #[error("Geolocation is not supported by this environment.")]
    Unsupported,

    #[error("Timeout expired")]
    Timeout,

    #[error("Position unavailable: {0}")]
    Unavailable(String),
}

/// Something that can tell where the user is
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self) -> Result<UserLocation, LocationError>;
}

/// Reports a preconfigured position
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    location: UserLocation,
}

impl FixedLocator {
    pub fn new(location: UserLocation) -> Self {
        Self { location }
    }
}

#[async_trait]
impl GeoLocator for FixedLocator {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        let coordinate = Coordinate::new(self.location.latitude, self.location.longitude);
        if coordinate.is_finite() {
            Ok(self.location)
        } else {
            Err(LocationError::Unavailable(format!(
                "invalid fixed position {}",
                coordinate
            )))
        }
    }
}

/// Used when the environment has no location capability at all
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocator;

#[async_trait]
impl GeoLocator for UnsupportedLocator {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Behaves like a user who declined the permission prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocator;

#[async_trait]
impl GeoLocator for DeniedLocator {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

/// Bounds another locator with a deadline
#[derive(Debug, Clone)]
pub struct TimeoutLocator<L> {
    inner: L,
    timeout: Duration,
}

impl<L: GeoLocator> TimeoutLocator<L> {
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<L: GeoLocator> GeoLocator for TimeoutLocator<L> {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        match tokio::time::timeout(self.timeout, self.inner.locate()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }
}

#[async_trait]
impl<L: GeoLocator + ?Sized> GeoLocator for Box<L> {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        (**self).locate().await
    }
}

#[async_trait]
impl<L: GeoLocator + ?Sized> GeoLocator for Arc<L> {
    async fn locate(&self) -> Result<UserLocation, LocationError> {
        (**self).locate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverLocator;

    #[async_trait]
    impl GeoLocator for NeverLocator {
        async fn locate(&self) -> Result<UserLocation, LocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_fixed_locator() {
        let locator = FixedLocator::new(UserLocation::new(59.437, 24.7535));
        assert_eq!(
            locator.locate().await,
            Ok(UserLocation::new(59.437, 24.7535))
        );
    }

    #[tokio::test]
    async fn test_fixed_locator_rejects_nan() {
        let locator = FixedLocator::new(UserLocation::new(f64::NAN, 24.7));
        assert!(matches!(
            locator.locate().await,
            Err(LocationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported() {
        let err = UnsupportedLocator.locate().await.unwrap_err();
        assert_eq!(err, LocationError::Unsupported);
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_denied() {
        let err = DeniedLocator.locate().await.unwrap_err();
        assert_eq!(err.to_string(), "User denied Geolocation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let locator = TimeoutLocator::new(NeverLocator, Duration::from_secs(5));
        assert_eq!(locator.locate().await, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_timeout_passes_result_through() {
        let boxed: Box<dyn GeoLocator> = Box::new(UnsupportedLocator);
        let locator = TimeoutLocator::new(boxed, Duration::from_secs(5));
        assert_eq!(locator.locate().await, Err(LocationError::Unsupported));
    }
}
