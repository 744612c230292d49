//! REST API Routes Module
//!
//! - `/v1/replicas/...` read and set replica counts
//! - `/v1/deployments` list deployments
//! - `/v1/healthz` cluster health
//! - `/metrics` Prometheus scrape endpoint

pub mod deployments;
pub mod health;
pub mod replicas;

use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware::{deadline_middleware, method_not_allowed, not_found, panic_response};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use deployments::create_router as deployments_router;
pub use health::create_router as health_router;
pub use replicas::create_router as replicas_router;

/// Build the full API router.
///
/// Layers, outermost first: request logging and metrics, panic containment,
/// then the per-request deadline.
pub fn create_api_router(state: AppState, request_deadline: Duration) -> Router {
    Router::new()
        .merge(replicas_router())
        .merge(deployments_router())
        .merge(health_router())
        .route("/metrics", get(metrics_handler).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn_with_state(request_deadline, deadline_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(observability_middleware))
}
