//! JSON answers for requests no handler accepts.

use crate::error::ApiError;

/// Router fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::not_found("not found")
}

/// Method fallback for known paths.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
