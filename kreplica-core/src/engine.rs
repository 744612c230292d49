//! Replica reconciliation engine.
//!
//! Every read or write of a workload's replica count fetches the live state
//! from the [`WorkloadDirectory`], compares it with the record held in the
//! [`CacheStore`], and persists the merged result. The engine keeps nothing in
//! memory between calls.
//!
//! # Concurrency
//!
//! There is no per-key locking and no compare-and-swap on the record. Two
//! concurrent calls for the same workload interleave freely and the store keeps
//! whichever persist step ran last.
//!
//! # Failure
//!
//! The first failed collaborator call aborts the operation. Nothing is
//! retried, and a failed workload lookup never reaches the store.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ReplicaResult;
use crate::key::WorkloadKey;
use crate::traits::{CacheStore, WorkloadDirectory};
use crate::types::{CacheRecord, ReadOutcome, ReplicaView, ReplicaWriteView};

/// Desired count assumed for a workload with no stored record.
pub const FIRST_SEEN_DESIRED: i32 = 0;

/// Stateless drift-detection and state-merge engine.
#[derive(Clone)]
pub struct ReplicaReconciler {
    directory: Arc<dyn WorkloadDirectory>,
    store: Arc<dyn CacheStore>,
}

impl ReplicaReconciler {
    pub fn new(directory: Arc<dyn WorkloadDirectory>, store: Arc<dyn CacheStore>) -> Self {
        Self { directory, store }
    }

    /// The workload directory this engine reconciles against.
    pub fn directory(&self) -> &Arc<dyn WorkloadDirectory> {
        &self.directory
    }

    /// Read the replica state of a workload, refreshing the cached record when
    /// the live count has drifted from the stored desired count.
    ///
    /// Observed state never overwrites operator intent: the stored desired
    /// count is carried forward unchanged.
    pub async fn read_replicas(&self, namespace: &str, name: &str) -> ReplicaResult<ReplicaView> {
        let spec = self.directory.get(namespace, name).await?;
        let observed = spec.observed_replicas;
        let key = WorkloadKey::new(namespace, name);

        let (desired, outcome) = match self.load_record(&key).await? {
            None => {
                debug!(key = %key, observed, "first sight of workload, creating record");
                (FIRST_SEEN_DESIRED, ReadOutcome::FirstSeen)
            }
            Some(record) if record.desired_replicas == observed => {
                debug!(
                    key = %key,
                    desired = record.desired_replicas,
                    "desired replicas match, returning cached state without writing"
                );
                return Ok(ReplicaView {
                    current: observed,
                    desired: record.desired_replicas,
                    drift: record.drift,
                    outcome: ReadOutcome::InSync,
                });
            }
            Some(record) => {
                debug!(
                    key = %key,
                    observed,
                    desired = record.desired_replicas,
                    "replica drift detected"
                );
                (record.desired_replicas, ReadOutcome::Drift)
            }
        };

        let record = CacheRecord::reconciled(desired, observed);
        self.store_record(&key, &record).await?;

        Ok(ReplicaView {
            current: observed,
            desired: record.desired_replicas,
            drift: record.drift,
            outcome,
        })
    }

    /// Set a workload's replica count and record it as the new desired state.
    ///
    /// The patch is issued before the cache is consulted; the previous record
    /// is read only to report prior intent. Drift is cleared optimistically
    /// without waiting for the orchestration system to converge.
    pub async fn write_replicas(
        &self,
        namespace: &str,
        name: &str,
        requested: i32,
    ) -> ReplicaResult<ReplicaWriteView> {
        let spec = self.directory.get(namespace, name).await?;
        self.directory
            .patch_replicas(namespace, name, requested)
            .await?;

        let key = WorkloadKey::new(namespace, name);
        let previous_desired = self
            .load_record(&key)
            .await?
            .map(|record| record.desired_replicas)
            .unwrap_or(FIRST_SEEN_DESIRED);

        let record = CacheRecord::accepted(requested);
        self.store_record(&key, &record).await?;

        Ok(ReplicaWriteView {
            namespace: namespace.to_string(),
            name: name.to_string(),
            previous_desired,
            requested_replicas: requested,
            observed_before_patch: spec.observed_replicas,
            drift: record.drift,
        })
    }

    async fn load_record(&self, key: &WorkloadKey) -> ReplicaResult<Option<CacheRecord>> {
        if !self.store.exists(key).await.map_err(|e| {
            error!(key = %key, error = %e, "error checking state in cache store");
            e
        })? {
            debug!(key = %key, "key does not exist in cache store");
            return Ok(None);
        }

        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %key, "key vanished between existence check and read");
                return Ok(None);
            }
            Err(e) => {
                error!(key = %key, error = %e, "error getting state from cache store");
                return Err(e);
            }
        };

        CacheRecord::from_bytes(&bytes).map(Some).map_err(|e| {
            error!(key = %key, error = %e, "error decoding cached state");
            e
        })
    }

    async fn store_record(&self, key: &WorkloadKey, record: &CacheRecord) -> ReplicaResult<()> {
        debug!(
            key = %key,
            desired = record.desired_replicas,
            current = record.current_replicas,
            drift = record.drift,
            "setting key in cache store"
        );
        let bytes = record.to_bytes()?;
        self.store.set(key, &bytes).await.map_err(|e| {
            error!(key = %key, error = %e, "error setting state in cache store");
            e
        })
    }
}
