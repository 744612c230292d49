//! Replica Endpoints
//!
//! `/v1/replicas/{namespace}/{deployment}`:
//! - GET/HEAD reads the replica state, refreshing the cached record on drift
//! - POST `{"replica_size": N}` scales the deployment and records the intent
//!
//! Shorter paths answer 400 before any upstream call is made.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use kreplica_core::{ReplicaReconciler, ReplicaView, ReplicaWriteView};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::metrics;

/// Route prefix shared by every replica path.
pub const REPLICAS_PREFIX: &str = "/v1/replicas";

const INCOMPLETE_PATH: &str = "No namespace and/or deployment provided";

// ============================================================================
// TYPES
// ============================================================================

/// Body of a POST request. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetReplicasRequest {
    pub replica_size: i32,
}

/// Response to GET/HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatusResponse {
    pub namespace: String,
    pub deployment_name: String,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub state_drift: bool,
    pub http_response_code: u16,
}

impl ReplicaStatusResponse {
    fn new(namespace: &str, name: &str, view: ReplicaView) -> Self {
        Self {
            namespace: namespace.to_string(),
            deployment_name: name.to_string(),
            current_replicas: view.current,
            desired_replicas: view.desired,
            state_drift: view.drift,
            http_response_code: StatusCode::OK.as_u16(),
        }
    }
}

/// Response to POST.
///
/// `current_replicas` is the count before the patch and `desired_replicas`
/// the intent it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaUpdateResponse {
    pub namespace: String,
    pub deployment_name: String,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub requested_replicas: i32,
    pub state_drift: bool,
    pub http_response_code: u16,
}

impl From<ReplicaWriteView> for ReplicaUpdateResponse {
    fn from(view: ReplicaWriteView) -> Self {
        Self {
            namespace: view.namespace,
            deployment_name: view.name,
            current_replicas: view.observed_before_patch,
            desired_replicas: view.previous_desired,
            requested_replicas: view.requested_replicas,
            state_drift: view.drift,
            http_response_code: StatusCode::OK.as_u16(),
        }
    }
}

// ============================================================================
// PATH PARSING
// ============================================================================

/// Split a request path into `(namespace, deployment)`.
///
/// Fewer than two non-empty segments is a 400. More than two segments names no
/// resource and is a 404.
pub fn parse_target(path: &str) -> ApiResult<(&str, &str)> {
    let rest = path.strip_prefix(REPLICAS_PREFIX).unwrap_or_default();
    let segments: Vec<&str> = rest.split('/').skip(1).collect();

    match segments.as_slice() {
        [namespace, name] if !namespace.is_empty() && !name.is_empty() => Ok((*namespace, *name)),
        [_, _, _, ..] => Err(ApiError::not_found("not found")),
        _ => Err(ApiError::bad_request(INCOMPLETE_PATH)),
    }
}

fn parse_body(body: &[u8]) -> ApiResult<SetReplicasRequest> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected replica request body");
        ApiError::bad_request("Bad request")
    })
}

/// Oversized or unreadable bodies keep the rejection's status but answer JSON.
fn body_rejection(rejection: BytesRejection) -> ApiError {
    tracing::debug!(error = %rejection, "Failed to read replica request body");
    ApiError::new(rejection.status(), rejection.body_text())
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Every method on every `/v1/replicas` path.
pub async fn replicas_handler(
    State(reconciler): State<ReplicaReconciler>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let (namespace, name) = parse_target(uri.path())?;

    match method {
        Method::GET | Method::HEAD => get_replicas(&reconciler, namespace, name).await,
        Method::POST => {
            let body = body.map_err(body_rejection)?;
            let request = parse_body(&body)?;
            set_replicas(&reconciler, namespace, name, request.replica_size).await
        }
        _ => Err(ApiError::method_not_allowed()),
    }
}

async fn get_replicas(
    reconciler: &ReplicaReconciler,
    namespace: &str,
    name: &str,
) -> ApiResult<Response> {
    let result = reconciler.read_replicas(namespace, name).await;
    let outcome = match &result {
        Ok(view) => view.outcome.as_str(),
        Err(_) => "error",
    };
    if let Some(metrics) = metrics() {
        metrics.record_reconciliation("read", outcome);
    }

    let view = result?;
    Ok(Json(ReplicaStatusResponse::new(namespace, name, view)).into_response())
}

async fn set_replicas(
    reconciler: &ReplicaReconciler,
    namespace: &str,
    name: &str,
    requested: i32,
) -> ApiResult<Response> {
    let result = reconciler.write_replicas(namespace, name, requested).await;
    if let Some(metrics) = metrics() {
        metrics.record_reconciliation("write", if result.is_ok() { "written" } else { "error" });
    }

    let view = result?;
    tracing::info!(
        namespace,
        deployment = name,
        previous_desired = view.previous_desired,
        requested,
        "Replica count updated"
    );
    Ok(Json(ReplicaUpdateResponse::from(view)).into_response())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the replicas router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(REPLICAS_PREFIX, any(replicas_handler))
        .route("/v1/replicas/", any(replicas_handler))
        .route("/v1/replicas/*rest", any(replicas_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_path() {
        assert_eq!(parse_target("/v1/replicas/test/app0").unwrap(), ("test", "app0"));
    }

    #[test]
    fn test_incomplete_paths_are_bad_requests() {
        for path in ["/v1/replicas", "/v1/replicas/", "/v1/replicas/test", "/v1/replicas/test/", "/v1/replicas//app0"] {
            let err = parse_target(path).unwrap_err();
            assert_eq!(err.http_response_code, 400, "path {}", path);
        }
    }

    #[test]
    fn test_extra_segments_are_not_found() {
        let err = parse_target("/v1/replicas/a/b/c").unwrap_err();
        assert_eq!(err.http_response_code, 404);
    }

    #[test]
    fn test_body_requires_replica_size() {
        assert_eq!(parse_body(br#"{"replica_size":5}"#).unwrap().replica_size, 5);
        assert_eq!(parse_body(br#"{"replica_size":-1}"#).unwrap().replica_size, -1);
        let rejected: [&[u8]; 6] = [
            b"",
            b"{}",
            br#"{"replica_size":"5"}"#,
            br#"{"replica_size":1.5}"#,
            br#"{"replica_size":2147483648}"#,
            br#"{"replica_size":1,"force":true}"#,
        ];
        for body in rejected {
            assert_eq!(parse_body(body).unwrap_err().http_response_code, 400);
        }
    }

    #[test]
    fn test_update_response_maps_write_view() {
        let response = ReplicaUpdateResponse::from(ReplicaWriteView {
            namespace: "test".into(),
            name: "app0".into(),
            previous_desired: 0,
            requested_replicas: 5,
            observed_before_patch: 3,
            drift: false,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "namespace": "test",
                "deployment_name": "app0",
                "current_replicas": 3,
                "desired_replicas": 0,
                "requested_replicas": 5,
                "state_drift": false,
                "http_response_code": 200
            })
        );
    }
}
