//! Shared application state for Axum routers.

use std::sync::Arc;

use kreplica_core::{ReplicaReconciler, WorkloadDirectory};

/// Version reported by `/v1/healthz`.
pub const APPLICATION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application-wide state shared across all routes.
///
/// Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Reconciliation engine over the shared directory and cache store.
    pub reconciler: ReplicaReconciler,
    /// Version string reported by the health endpoint.
    pub version: &'static str,
}

impl AppState {
    pub fn new(reconciler: ReplicaReconciler) -> Self {
        Self {
            reconciler,
            version: APPLICATION_VERSION,
        }
    }

    /// Directory used for listing and health probes.
    pub fn directory(&self) -> &Arc<dyn WorkloadDirectory> {
        self.reconciler.directory()
    }
}

impl_from_ref!(ReplicaReconciler, reconciler);
