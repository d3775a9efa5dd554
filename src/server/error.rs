//! Server Error Types
//!
//! Errors of the vehicles/stops backend and their HTTP responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::stops::StopsError;

/// Text body relayed when the upstream feed answers with an error status
pub const UPSTREAM_FAILURE_TEXT: &str = "Failed to fetch data from external API";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Upstream GPS feed answered with a non-success status
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16 },

    /// Upstream GPS feed could not be reached
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] reqwest::Error),

    #[error("Stops error: {0}")]
    Stops(#[from] StopsError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream { status } = self {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            tracing::warn!(status = status.as_u16(), "Relaying upstream failure");
            return (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                UPSTREAM_FAILURE_TEXT,
            )
                .into_response();
        }

        let (status, code) = match &self {
            ApiError::UpstreamUnavailable(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT")
            }
            ApiError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            ApiError::Stops(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STOPS_ERROR"),
            ApiError::Internal(_) | ApiError::Upstream { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_relayed() {
        let response = ApiError::Upstream { status: 503 }.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_internal_error_is_json() {
        let response = ApiError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
