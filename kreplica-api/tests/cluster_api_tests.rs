//! HTTP tests for the health, deployment listing and metrics endpoints.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use kreplica_api::state::APPLICATION_VERSION;
use kreplica_test_utils::fixtures;
use kreplica_test_utils::{DirectoryOp, ScriptedWorkloadDirectory};
use serde_json::json;

#[path = "support/http.rs"]
mod http_support;
use http_support::{app, error_body, send, send_raw};

fn cluster() -> Arc<ScriptedWorkloadDirectory> {
    Arc::new(
        ScriptedWorkloadDirectory::new()
            .with_deployment("default", "web", 2)
            .with_deployment("kube-system", "coredns", 2)
            .with_deployment("test", "app0", 3),
    )
}

#[tokio::test]
async fn test_healthz_reports_version() {
    let app = app(cluster(), fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "http_response_code": 200,
            "kubernetes_api_status": "ok",
            "application_version": APPLICATION_VERSION
        })
    );
}

#[tokio::test]
async fn test_healthz_failure_is_500() {
    let directory = cluster();
    directory.fail(DirectoryOp::Health, fixtures::upstream(503, "livez failed"));
    let app = app(directory, fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/healthz", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        error_body(500, "kubernetes API /livez check failed, cluster is unhealthy")
    );
}

#[tokio::test]
async fn test_healthz_rejects_post() {
    let directory = cluster();
    let app = app(directory.clone(), fixtures::empty_store());

    let (status, body) = send(&app, Method::POST, "/v1/healthz", Some("{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, error_body(405, "method not allowed"));
    assert_eq!(directory.calls(DirectoryOp::Health), 0);
}

#[tokio::test]
async fn test_list_all_deployments() {
    let app = app(cluster(), fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/deployments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["http_response_code"], 200);
    assert_eq!(body["deployments"].as_array().map(Vec::len), Some(3));
    assert!(body["deployments"]
        .as_array()
        .unwrap()
        .contains(&json!({ "deployment_name": "coredns", "namespace": "kube-system" })));
}

#[tokio::test]
async fn test_list_filtered_by_namespace() {
    let app = app(cluster(), fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/deployments?namespace=test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "http_response_code": 200,
            "deployments": [{ "deployment_name": "app0", "namespace": "test" }]
        })
    );

    // Empty value lists everything.
    let (_, body) = send(&app, Method::GET, "/v1/deployments?namespace=", None).await;
    assert_eq!(body["deployments"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_empty_listing_is_not_found() {
    let app = app(cluster(), fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/deployments?namespace=nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, error_body(404, "no deployments found"));
}

#[tokio::test]
async fn test_listing_failure_hides_detail() {
    let directory = cluster();
    directory.fail(DirectoryOp::List, kreplica_core::ReplicaError::upstream("connection reset"));
    let app = app(directory, fixtures::empty_store());

    let (status, body) = send(&app, Method::GET, "/v1/deployments", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, error_body(500, "Internal server error"));
}

#[tokio::test]
async fn test_deployments_rejects_post() {
    let app = app(cluster(), fixtures::empty_store());
    let (status, body) = send(&app, Method::POST, "/v1/deployments", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "method not allowed");
}

#[tokio::test]
async fn test_metrics_exposes_request_counters() {
    let app = app(cluster(), fixtures::empty_store());

    let (status, _) = send(&app, Method::GET, "/v1/replicas/test/app0", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes) = send_raw(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("kreplica_http_requests_total"));
    assert!(text.contains("kreplica_reconciliations_total"));
    assert!(text.contains("/v1/replicas/*rest"));
}

#[tokio::test]
async fn test_metrics_rejects_post_with_json() {
    let app = app(cluster(), fixtures::empty_store());
    let (status, body) = send(&app, Method::POST, "/metrics", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, error_body(405, "method not allowed"));
}
