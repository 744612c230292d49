//! Collaborator capabilities consumed by the reconciliation engine.
//!
//! Both traits are implemented by long-lived handles created once at startup
//! and shared by every request. Implementations must be safe for concurrent
//! use without external locking.

use async_trait::async_trait;

use crate::error::ReplicaResult;
use crate::key::WorkloadKey;
use crate::types::{WorkloadRef, WorkloadSpec};

/// Access to workloads held by the orchestration system.
///
/// # Errors
///
/// A missing workload is reported as [`ErrorKind::NotFound`](crate::ErrorKind::NotFound);
/// any other failure is [`ErrorKind::Upstream`](crate::ErrorKind::Upstream), carrying the
/// upstream status code when one was returned.
#[async_trait]
pub trait WorkloadDirectory: Send + Sync {
    /// Fetch a workload and its current replica count.
    async fn get(&self, namespace: &str, name: &str) -> ReplicaResult<WorkloadSpec>;

    /// Merge-patch the workload's replica count.
    async fn patch_replicas(&self, namespace: &str, name: &str, replicas: i32) -> ReplicaResult<()>;

    /// List workloads, across all namespaces when `namespace` is `None`.
    async fn list(&self, namespace: Option<&str>) -> ReplicaResult<Vec<WorkloadRef>>;

    /// Probe the orchestration system's liveness endpoint.
    async fn check_health(&self) -> ReplicaResult<()>;
}

/// Key/value store holding serialized cache records.
///
/// Last write wins. No ordering, locking or compare-and-swap is offered.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &WorkloadKey) -> ReplicaResult<bool>;

    /// Returns `None` when the key is absent.
    async fn get(&self, key: &WorkloadKey) -> ReplicaResult<Option<Vec<u8>>>;

    async fn set(&self, key: &WorkloadKey, value: &[u8]) -> ReplicaResult<()>;
}
