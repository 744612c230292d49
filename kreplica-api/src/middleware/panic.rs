//! Panic containment.

use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Response for a handler that panicked.
///
/// The payload is logged; the caller only sees the generic 500 body.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "Non-fatal error occurred in request handler");
    ApiError::internal().into_response()
}
