//! Health Check Endpoint
//!
//! `GET /v1/healthz` probes the Kubernetes API server's `/livez` and reports
//! the application version. No authentication beyond the mTLS handshake.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::method_not_allowed;
use crate::state::AppState;

const UNHEALTHY_MESSAGE: &str = "kubernetes API /livez check failed, cluster is unhealthy";

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub http_response_code: u16,
    pub kubernetes_api_status: String,
    pub application_version: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /v1/healthz
pub async fn healthz(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    if let Err(e) = state.directory().check_health().await {
        tracing::error!(error = %e, "Kubernetes health check failed");
        return Err(ApiError::internal_error(UNHEALTHY_MESSAGE));
    }

    Ok(Json(HealthResponse {
        http_response_code: StatusCode::OK.as_u16(),
        kubernetes_api_status: "ok".to_string(),
        application_version: state.version.to_string(),
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the health router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/v1/healthz", get(healthz).fallback(method_not_allowed))
}
