//! Replica state data model.

use serde::{Deserialize, Serialize};

use crate::error::ReplicaResult;

// ============================================================================
// ORCHESTRATION-SIDE TYPES
// ============================================================================

/// Live view of a workload as reported by the orchestration system.
///
/// Fetched fresh on every engine call and never cached by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub namespace: String,
    pub name: String,
    pub observed_replicas: i32,
}

impl WorkloadSpec {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, observed_replicas: i32) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            observed_replicas,
        }
    }
}

/// Namespace/name pair returned by workload listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRef {
    #[serde(rename = "deployment_name")]
    pub name: String,
    pub namespace: String,
}

// ============================================================================
// CACHE RECORD
// ============================================================================

/// Persisted desired/current replica state for one workload.
///
/// Stored as JSON `{desired_replicas, current_replicas, state_drift}` so other
/// processes inspecting the store can read it directly.
///
/// `desired_replicas == 0` is also the placeholder written on first sight of a
/// workload, so a record cannot tell "never set" apart from "scaled to zero on
/// purpose".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub desired_replicas: i32,
    pub current_replicas: i32,
    #[serde(rename = "state_drift")]
    pub drift: bool,
}

impl CacheRecord {
    /// Build a record whose drift flag agrees with its two counts.
    pub fn reconciled(desired_replicas: i32, current_replicas: i32) -> Self {
        Self {
            desired_replicas,
            current_replicas,
            drift: desired_replicas != current_replicas,
        }
    }

    /// Record written after an operator sets the count: intent is assumed applied.
    pub fn accepted(requested: i32) -> Self {
        Self {
            desired_replicas: requested,
            current_replicas: requested,
            drift: false,
        }
    }

    pub fn to_bytes(&self) -> ReplicaResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> ReplicaResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ============================================================================
// ENGINE RESULTS
// ============================================================================

/// Which branch a read reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadOutcome {
    /// No record existed; one was created.
    FirstSeen,
    /// Stored desired count matched the live count; the store was not written.
    InSync,
    /// Stored desired count differed from the live count; the record was refreshed.
    Drift,
}

impl ReadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadOutcome::FirstSeen => "first_seen",
            ReadOutcome::InSync => "in_sync",
            ReadOutcome::Drift => "drift",
        }
    }
}

/// Outcome of a read reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaView {
    pub current: i32,
    pub desired: i32,
    pub drift: bool,
    pub outcome: ReadOutcome,
}

/// Outcome of a write reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaWriteView {
    pub namespace: String,
    pub name: String,
    /// Desired count stored before this write, 0 when no record existed.
    pub previous_desired: i32,
    pub requested_replicas: i32,
    /// Replica count the orchestration system reported before the patch.
    pub observed_before_patch: i32,
    pub drift: bool,
}
