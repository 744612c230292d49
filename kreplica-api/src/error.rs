//! Error Types for the kreplica API
//!
//! Every failure leaves the server as a JSON body of the same shape:
//! `{"http_response_code": <status>, "message": <text>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kreplica_core::{ErrorKind, ReplicaError};
use serde::{Deserialize, Serialize};

/// Message used whenever internal detail must not reach the caller.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// ============================================================================
// API ERROR
// ============================================================================

/// JSON error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{http_response_code}: {message}")]
pub struct ApiError {
    pub http_response_code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            http_response_code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Status to send. Out-of-range codes reported upstream collapse to 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_response_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    pub fn timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "request timed out")
    }

    /// Generic 500 with no internal detail.
    pub fn internal() -> Self {
        Self::internal_error(INTERNAL_ERROR_MESSAGE)
    }

    /// 500 with a specific message. Used for startup failures.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Self {
            http_response_code: status.as_u16(),
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ReplicaError> for ApiError {
    fn from(err: ReplicaError) -> Self {
        match (err.kind, err.status_hint) {
            (ErrorKind::Upstream, None) => {
                tracing::error!(error = %err.message, "Upstream failure");
                Self::internal()
            }
            _ => Self {
                http_response_code: err.http_status(),
                message: err.message,
            },
        }
    }
}

/// Result type for API handlers and server setup.
pub type ApiResult<T> = Result<T, ApiError>;
