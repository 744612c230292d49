//! kreplica core - replica state reconciliation
//!
//! Domain types, the collaborator capabilities the engine consumes, and the
//! request-driven reconciliation engine itself. Transport, routing and the
//! concrete orchestration/cache clients live in sibling crates.

pub mod engine;
pub mod error;
pub mod key;
pub mod traits;
pub mod types;

pub use engine::{ReplicaReconciler, FIRST_SEEN_DESIRED};
pub use error::{ErrorKind, ReplicaError, ReplicaResult};
pub use key::{WorkloadKey, KEY_SEPARATOR};
pub use traits::{CacheStore, WorkloadDirectory};
pub use types::{CacheRecord, ReadOutcome, ReplicaView, ReplicaWriteView, WorkloadRef, WorkloadSpec};
