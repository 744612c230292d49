//! kreplica API - HTTP surface for replica reconciliation
//!
//! Axum routes over [`kreplica_core::ReplicaReconciler`], JSON error mapping,
//! panic containment, per-request deadlines, the mTLS listener and the
//! logging/metrics stack. The `kreplica-server` binary wires these to the
//! Kubernetes directory and the configured cache store.

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod tls;

pub use config::{CacheBackend, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;
