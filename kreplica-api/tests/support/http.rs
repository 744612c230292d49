//! Shared helpers for driving the router in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kreplica_api::{create_api_router, AppState};
use kreplica_core::{CacheStore, ReplicaReconciler, WorkloadDirectory};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

pub fn app_with_deadline(
    directory: Arc<dyn WorkloadDirectory>,
    store: Arc<dyn CacheStore>,
    deadline: Duration,
) -> Router {
    let state = AppState::new(ReplicaReconciler::new(directory, store));
    create_api_router(state, deadline)
}

pub fn app(directory: Arc<dyn WorkloadDirectory>, store: Arc<dyn CacheStore>) -> Router {
    app_with_deadline(directory, store, TEST_DEADLINE)
}

/// Send one request and decode the JSON body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, method, uri, body).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!("non-JSON body from {}: {} ({:?})", uri, e, String::from_utf8_lossy(&bytes))
        })
    };
    (status, json)
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub fn error_body(status: u16, message: &str) -> Value {
    serde_json::json!({ "http_response_code": status, "message": message })
}
