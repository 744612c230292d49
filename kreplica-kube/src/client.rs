//! [`WorkloadDirectory`] backed by the Kubernetes `apps/v1` REST API.

use std::time::Duration;

use async_trait::async_trait;
use kreplica_core::{ReplicaError, ReplicaResult, WorkloadDirectory, WorkloadRef, WorkloadSpec};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClusterConfig;
use crate::error::{api_error, KubeError};

/// Replica count assumed when a deployment omits `spec.replicas`.
pub const DEFAULT_REPLICAS: i32 = 1;

const MERGE_PATCH: &str = "application/merge-patch+json";

/// Deployment directory talking to a Kubernetes API server.
#[derive(Debug, Clone)]
pub struct KubeWorkloadDirectory {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl KubeWorkloadDirectory {
    /// Build a directory from resolved cluster settings.
    ///
    /// `timeout` bounds every API call.
    pub fn new(config: &ClusterConfig, timeout: Duration) -> Result<Self, KubeError> {
        let base = Url::parse(&config.server).map_err(|e| {
            KubeError::Config(format!("invalid API server URL '{}': {}", config.server, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(KubeError::Config(format!(
                "API server URL '{}' cannot carry a path",
                config.server
            )));
        }

        Ok(Self {
            http: config.http_client(timeout)?,
            base,
            token: config.token.clone(),
        })
    }

    /// API server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn deployment_url(&self, namespace: &str, name: &str) -> Url {
        self.endpoint(&["apis", "apps", "v1", "namespaces", namespace, "deployments", name])
    }

    fn deployments_url(&self, namespace: Option<&str>) -> Url {
        match namespace {
            Some(ns) => self.endpoint(&["apis", "apps", "v1", "namespaces", ns, "deployments"]),
            None => self.endpoint(&["apis", "apps", "v1", "deployments"]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, KubeError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct Deployment {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Option<DeploymentSpec>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentSpec {
    #[serde(default)]
    replicas: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DeploymentList {
    #[serde(default)]
    items: Vec<Deployment>,
}

impl Deployment {
    fn replicas(&self) -> i32 {
        self.spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(DEFAULT_REPLICAS)
    }
}

fn replicas_patch(replicas: i32) -> serde_json::Value {
    serde_json::json!({ "spec": { "replicas": replicas } })
}

// ============================================================================
// DIRECTORY
// ============================================================================

#[async_trait]
impl WorkloadDirectory for KubeWorkloadDirectory {
    async fn get(&self, namespace: &str, name: &str) -> ReplicaResult<WorkloadSpec> {
        let url = self.deployment_url(namespace, name);
        debug!(%url, "Fetching deployment");
        let response = self.send(self.request(Method::GET, url)).await?;
        let deployment: Deployment = response.json().await.map_err(KubeError::from)?;
        Ok(WorkloadSpec::new(namespace, name, deployment.replicas()))
    }

    async fn patch_replicas(&self, namespace: &str, name: &str, replicas: i32) -> ReplicaResult<()> {
        let url = self.deployment_url(namespace, name);
        debug!(%url, replicas, "Patching deployment replicas");
        let body = replicas_patch(replicas).to_string();
        let builder = self
            .request(Method::PATCH, url)
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH)
            .body(body);
        self.send(builder).await?;
        Ok(())
    }

    async fn list(&self, namespace: Option<&str>) -> ReplicaResult<Vec<WorkloadRef>> {
        let url = self.deployments_url(namespace.filter(|ns| !ns.is_empty()));
        debug!(%url, "Listing deployments");
        let response = self.send(self.request(Method::GET, url)).await?;
        let list: DeploymentList = response.json().await.map_err(KubeError::from)?;
        Ok(list
            .items
            .into_iter()
            .map(|d| WorkloadRef {
                name: d.metadata.name,
                namespace: d.metadata.namespace,
            })
            .collect())
    }

    async fn check_health(&self) -> ReplicaResult<()> {
        let url = self.endpoint(&["livez"]);
        match self.send(self.request(Method::GET, url)).await {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Kubernetes /livez probe failed");
                Err(ReplicaError::upstream(format!("/livez probe failed: {}", e)))
            }
        }
    }
}
