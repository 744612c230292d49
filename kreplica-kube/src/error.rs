//! Kubernetes client errors.

use std::path::PathBuf;

use kreplica_core::ReplicaError;
use serde::Deserialize;

/// Error type for cluster configuration and API calls.
#[derive(Debug, thiserror::Error)]
pub enum KubeError {
    /// Cluster configuration is missing or inconsistent.
    #[error("Invalid cluster configuration: {0}")]
    Config(String),

    /// Failed to read a configuration file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Kubeconfig is not valid YAML or lacks required fields.
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(#[from] serde_yaml::Error),

    /// Transport, TLS or body decoding failure.
    #[error("Kubernetes API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API server answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl From<KubeError> for ReplicaError {
    fn from(e: KubeError) -> Self {
        match e {
            KubeError::Api { status: 404, message } => {
                ReplicaError::not_found(message).with_status(404)
            }
            KubeError::Api { status, message } => {
                ReplicaError::upstream(message).with_status(status)
            }
            other => ReplicaError::upstream(other.to_string()),
        }
    }
}

/// `Status` object returned by the API server on failures.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<u16>,
}

/// Build an [`KubeError::Api`] from a failed response.
///
/// The status code in a `Status` body takes precedence over the HTTP status.
pub(crate) fn api_error(http_status: u16, body: &str) -> KubeError {
    let parsed = serde_json::from_str::<ApiStatus>(body).ok();
    let status = parsed
        .as_ref()
        .and_then(|s| s.code)
        .filter(|code| (100..=599).contains(code))
        .unwrap_or(http_status);
    let message = parsed
        .and_then(|s| s.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("the server responded with status {}", status));
    KubeError::Api { status, message }
}
