//! Per-request deadline.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Abort the request once `deadline` has elapsed.
///
/// Dropping the handler future cancels any in-flight upstream call. Cache
/// writes already issued are not rolled back.
pub async fn deadline_middleware(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                method = %method,
                path = %path,
                deadline_ms = deadline.as_millis(),
                "Request deadline exceeded"
            );
            ApiError::timeout().into_response()
        }
    }
}
