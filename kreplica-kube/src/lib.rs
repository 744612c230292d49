//! Kubernetes deployment directory for kreplica.
//!
//! Reads, scales and lists `apps/v1` Deployments over the API server's REST
//! interface. Connection settings come from the pod service account or a
//! kubeconfig file.

pub mod client;
pub mod config;
pub mod error;

pub use client::{KubeWorkloadDirectory, DEFAULT_REPLICAS};
pub use config::{default_kubeconfig_path, ClusterConfig, SERVICE_ACCOUNT_DIR};
pub use error::KubeError;
