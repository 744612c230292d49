//! kreplica Test Utilities
//!
//! Shared test infrastructure for the kreplica workspace:
//! - Scripted collaborator doubles with call counters and injectable failures
//! - Proptest generators for replica state
//! - Fixtures for common scenarios
//! - Assertions for error kinds

pub use kreplica_storage::InMemoryCacheStore;

pub use kreplica_core::{
    CacheRecord, CacheStore, ErrorKind, ReadOutcome, ReplicaError, ReplicaReconciler,
    ReplicaResult, ReplicaView, ReplicaWriteView, WorkloadDirectory, WorkloadKey, WorkloadRef,
    WorkloadSpec,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

// ============================================================================
// SCRIPTED WORKLOAD DIRECTORY
// ============================================================================

/// Directory operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
    Get,
    Patch,
    List,
    Health,
}

/// In-memory [`WorkloadDirectory`] with call counters and scripted failures.
#[derive(Debug, Default)]
pub struct ScriptedWorkloadDirectory {
    deployments: Mutex<BTreeMap<(String, String), i32>>,
    failures: Mutex<HashMap<DirectoryOp, ReplicaError>>,
    calls: Mutex<HashMap<DirectoryOp, usize>>,
    panic_on_get: AtomicBool,
}

impl ScriptedWorkloadDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deployment with the given replica count.
    pub fn with_deployment(self, namespace: &str, name: &str, replicas: i32) -> Self {
        self.set_replicas(namespace, name, replicas);
        self
    }

    /// Make every call of `op` fail with `error`.
    pub fn failing(self, op: DirectoryOp, error: ReplicaError) -> Self {
        self.fail(op, error);
        self
    }

    /// Make `get` panic, for exercising panic containment.
    pub fn panicking(self) -> Self {
        self.panic_on_get.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail(&self, op: DirectoryOp, error: ReplicaError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Change the live replica count, as an external scaler would.
    pub fn set_replicas(&self, namespace: &str, name: &str, replicas: i32) {
        self.deployments
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), replicas);
    }

    /// Live replica count, if the deployment exists.
    pub fn replicas(&self, namespace: &str, name: &str) -> Option<i32> {
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    /// Number of times `op` was invoked.
    pub fn calls(&self, op: DirectoryOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Total invocations across every operation.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, op: DirectoryOp) -> ReplicaResult<()> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn missing(name: &str) -> ReplicaError {
        ReplicaError::not_found(format!("deployments.apps \"{}\" not found", name)).with_status(404)
    }
}

#[async_trait]
impl WorkloadDirectory for ScriptedWorkloadDirectory {
    async fn get(&self, namespace: &str, name: &str) -> ReplicaResult<WorkloadSpec> {
        self.enter(DirectoryOp::Get)?;
        if self.panic_on_get.load(Ordering::SeqCst) {
            panic!("scripted directory panic");
        }
        self.replicas(namespace, name)
            .map(|replicas| WorkloadSpec::new(namespace, name, replicas))
            .ok_or_else(|| Self::missing(name))
    }

    async fn patch_replicas(&self, namespace: &str, name: &str, replicas: i32) -> ReplicaResult<()> {
        self.enter(DirectoryOp::Patch)?;
        let mut deployments = self.deployments.lock().unwrap();
        match deployments.get_mut(&(namespace.to_string(), name.to_string())) {
            Some(current) => {
                *current = replicas;
                Ok(())
            }
            None => Err(Self::missing(name)),
        }
    }

    async fn list(&self, namespace: Option<&str>) -> ReplicaResult<Vec<WorkloadRef>> {
        self.enter(DirectoryOp::List)?;
        Ok(self
            .deployments
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| namespace.map_or(true, |wanted| ns == wanted))
            .map(|(ns, name)| WorkloadRef {
                name: name.clone(),
                namespace: ns.clone(),
            })
            .collect())
    }

    async fn check_health(&self) -> ReplicaResult<()> {
        self.enter(DirectoryOp::Health)
    }
}

// ============================================================================
// FAULTY CACHE STORE
// ============================================================================

/// Cache store operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Exists,
    Get,
    Set,
}

/// In-memory [`CacheStore`] that counts writes and fails chosen operations.
#[derive(Debug, Default)]
pub struct FaultyCacheStore {
    inner: InMemoryCacheStore,
    failures: Mutex<HashMap<StoreOp, ReplicaError>>,
    writes: AtomicUsize,
    vanish_on_get: AtomicBool,
}

impl FaultyCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a record.
    pub fn with_record(self, namespace: &str, name: &str, record: CacheRecord) -> Self {
        self.seed(namespace, name, record);
        self
    }

    pub fn failing(self, op: StoreOp, error: ReplicaError) -> Self {
        self.fail(op, error);
        self
    }

    /// Report every key as existing but return nothing on `get`, as when a
    /// record expires between the two calls.
    pub fn vanishing(self) -> Self {
        self.vanish_on_get.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail(&self, op: StoreOp, error: ReplicaError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn seed(&self, namespace: &str, name: &str, record: CacheRecord) {
        let bytes = serde_json::to_vec(&record).unwrap();
        self.seed_raw(namespace, name, bytes);
    }

    pub fn seed_raw(&self, namespace: &str, name: &str, bytes: Vec<u8>) {
        let key = WorkloadKey::new(namespace, name);
        self.inner.insert_raw(key.as_str(), bytes);
    }

    /// Decoded record for a workload, if present and well formed.
    pub fn record(&self, namespace: &str, name: &str) -> Option<CacheRecord> {
        self.raw(namespace, name)
            .and_then(|bytes| CacheRecord::from_bytes(&bytes).ok())
    }

    pub fn raw(&self, namespace: &str, name: &str) -> Option<Vec<u8>> {
        self.inner.raw(WorkloadKey::new(namespace, name).as_str())
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self, op: StoreOp) -> ReplicaResult<()> {
        match self.failures.lock().unwrap().get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CacheStore for FaultyCacheStore {
    async fn exists(&self, key: &WorkloadKey) -> ReplicaResult<bool> {
        self.check(StoreOp::Exists)?;
        if self.vanish_on_get.load(Ordering::SeqCst) {
            return Ok(true);
        }
        self.inner.exists(key).await
    }

    async fn get(&self, key: &WorkloadKey) -> ReplicaResult<Option<Vec<u8>>> {
        self.check(StoreOp::Get)?;
        if self.vanish_on_get.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &WorkloadKey, value: &[u8]) -> ReplicaResult<()> {
        self.check(StoreOp::Set)?;
        self.inner.set(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for replica state.

    use super::*;
    use proptest::prelude::*;

    /// A DNS-1123 label, the shape of namespace and deployment names.
    pub fn arb_label() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,14}"
    }

    /// Replica counts in a realistic range.
    pub fn arb_replicas() -> impl Strategy<Value = i32> {
        0..=50i32
    }

    /// A pair of distinct replica counts.
    pub fn arb_distinct_replicas() -> impl Strategy<Value = (i32, i32)> {
        (arb_replicas(), arb_replicas()).prop_filter("counts must differ", |(a, b)| a != b)
    }

    pub fn arb_workload_spec() -> impl Strategy<Value = WorkloadSpec> {
        (arb_label(), arb_label(), arb_replicas())
            .prop_map(|(ns, name, replicas)| WorkloadSpec::new(ns, name, replicas))
    }

    pub fn arb_cache_record() -> impl Strategy<Value = CacheRecord> {
        (arb_replicas(), arb_replicas(), any::<bool>()).prop_map(|(desired, current, drift)| {
            CacheRecord {
                desired_replicas: desired,
                current_replicas: current,
                drift,
            }
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made collaborators for common scenarios.

    use super::*;

    pub const NAMESPACE: &str = "test";
    pub const DEPLOYMENT: &str = "app0";
    pub const OBSERVED: i32 = 3;

    /// Directory holding `test/app0` at three replicas.
    pub fn directory() -> Arc<ScriptedWorkloadDirectory> {
        Arc::new(ScriptedWorkloadDirectory::new().with_deployment(NAMESPACE, DEPLOYMENT, OBSERVED))
    }

    pub fn empty_store() -> Arc<FaultyCacheStore> {
        Arc::new(FaultyCacheStore::new())
    }

    /// Engine wired to the given doubles.
    pub fn reconciler(
        directory: Arc<ScriptedWorkloadDirectory>,
        store: Arc<FaultyCacheStore>,
    ) -> ReplicaReconciler {
        ReplicaReconciler::new(directory, store)
    }

    /// Engine over [`directory`] and an empty store, with handles to both.
    pub fn scenario() -> (
        ReplicaReconciler,
        Arc<ScriptedWorkloadDirectory>,
        Arc<FaultyCacheStore>,
    ) {
        let directory = directory();
        let store = empty_store();
        (reconciler(directory.clone(), store.clone()), directory, store)
    }

    /// Upstream failure carrying an HTTP status.
    pub fn upstream(status: u16, message: &str) -> ReplicaError {
        ReplicaError::upstream(message).with_status(status)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on error classification.

    use super::*;

    pub fn assert_kind<T: std::fmt::Debug>(result: &ReplicaResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind, kind, "unexpected error kind: {}", e),
            Ok(v) => panic!("expected {} error, got Ok({:?})", kind, v),
        }
    }

    pub fn assert_not_found<T: std::fmt::Debug>(result: &ReplicaResult<T>) {
        assert_kind(result, ErrorKind::NotFound);
    }

    pub fn assert_upstream<T: std::fmt::Debug>(result: &ReplicaResult<T>) {
        assert_kind(result, ErrorKind::Upstream);
    }

    /// The error resolves to `status` when rendered over HTTP.
    pub fn assert_status<T: std::fmt::Debug>(result: &ReplicaResult<T>, status: u16) {
        match result {
            Err(e) => assert_eq!(e.http_status(), status, "unexpected status for: {}", e),
            Ok(v) => panic!("expected error with status {}, got Ok({:?})", status, v),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
