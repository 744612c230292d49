//! Deployment Listing Endpoint
//!
//! `GET /v1/deployments[?namespace=<ns>]` lists deployments across the cluster
//! or within one namespace. Read-only; no reconciliation happens here.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use kreplica_core::WorkloadRef;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::method_not_allowed;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentsResponse {
    pub http_response_code: u16,
    pub deployments: Vec<WorkloadRef>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /v1/deployments
///
/// Only the first `namespace` parameter counts; an empty value lists all
/// namespaces.
pub async fn list_deployments(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<DeploymentsResponse>> {
    let namespace = params
        .iter()
        .find(|(key, _)| key == "namespace")
        .map(|(_, value)| value.as_str())
        .filter(|ns| !ns.is_empty());
    let deployments = state.directory().list(namespace).await?;

    if deployments.is_empty() {
        return Err(ApiError::not_found("no deployments found"));
    }

    Ok(Json(DeploymentsResponse {
        http_response_code: StatusCode::OK.as_u16(),
        deployments,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the deployments router.
pub fn create_router() -> Router<AppState> {
    Router::new().route(
        "/v1/deployments",
        get(list_deployments).fallback(method_not_allowed),
    )
}
