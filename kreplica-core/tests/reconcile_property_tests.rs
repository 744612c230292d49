//! Property-Based Tests for Replica Reconciliation
//!
//! - Reads never overwrite the stored desired count
//! - A read with matching counts is a pure read
//! - A write records the request as desired and clears drift
//! - A write reports the desired count it replaced
//! - A failed workload lookup never touches the cache store

use kreplica_core::{CacheRecord, ReadOutcome, ReplicaReconciler, ReplicaResult};
use kreplica_test_utils::generators::{arb_distinct_replicas, arb_label, arb_replicas};
use kreplica_test_utils::{fixtures, DirectoryOp, FaultyCacheStore, ScriptedWorkloadDirectory};
use proptest::prelude::*;
use std::sync::Arc;
use tokio::runtime::Runtime;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn harness(
    namespace: &str,
    name: &str,
    observed: i32,
) -> (
    ReplicaReconciler,
    Arc<ScriptedWorkloadDirectory>,
    Arc<FaultyCacheStore>,
) {
    let directory = Arc::new(ScriptedWorkloadDirectory::new().with_deployment(namespace, name, observed));
    let store = fixtures::empty_store();
    (
        fixtures::reconciler(directory.clone(), store.clone()),
        directory,
        store,
    )
}

fn to_case<T>(result: ReplicaResult<T>) -> Result<T, TestCaseError> {
    result.map_err(|e| TestCaseError::fail(e.to_string()))
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A first read stores desired 0 and flags drift unless the workload is at 0.
    #[test]
    fn prop_first_read_records_sentinel(
        namespace in arb_label(),
        name in arb_label(),
        observed in arb_replicas(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, _directory, store) = harness(&namespace, &name, observed);

            let view = to_case(engine.read_replicas(&namespace, &name).await)?;
            prop_assert_eq!(view.outcome, ReadOutcome::FirstSeen);
            prop_assert_eq!(view.current, observed);
            prop_assert_eq!(view.desired, 0);
            prop_assert_eq!(view.drift, observed != 0);
            prop_assert_eq!(
                store.record(&namespace, &name),
                Some(CacheRecord { desired_replicas: 0, current_replicas: observed, drift: observed != 0 })
            );
            Ok(())
        })?;
    }

    /// Drift keeps the stored desired count and records the observed one.
    #[test]
    fn prop_drift_preserves_intent(
        name in arb_label(),
        (desired, observed) in arb_distinct_replicas(),
        stale_current in arb_replicas(),
        stale_drift in any::<bool>(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, _directory, store) = harness("apps", &name, observed);
            store.seed("apps", &name, CacheRecord {
                desired_replicas: desired,
                current_replicas: stale_current,
                drift: stale_drift,
            });

            let view = to_case(engine.read_replicas("apps", &name).await)?;
            prop_assert_eq!(view.outcome, ReadOutcome::Drift);
            prop_assert_eq!(view.desired, desired);
            prop_assert!(view.drift);
            prop_assert_eq!(
                store.record("apps", &name),
                Some(CacheRecord { desired_replicas: desired, current_replicas: observed, drift: true })
            );
            Ok(())
        })?;
    }

    /// Reading an in-sync workload any number of times writes nothing.
    #[test]
    fn prop_in_sync_reads_are_pure(
        name in arb_label(),
        replicas in arb_replicas(),
        repeats in 1usize..5,
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, _directory, store) = harness("apps", &name, replicas);
            store.seed("apps", &name, CacheRecord::accepted(replicas));

            for _ in 0..repeats {
                let view = to_case(engine.read_replicas("apps", &name).await)?;
                prop_assert_eq!(view.outcome, ReadOutcome::InSync);
                prop_assert_eq!(view.desired, replicas);
                prop_assert!(!view.drift);
            }
            prop_assert_eq!(store.writes(), 0);
            Ok(())
        })?;
    }

    /// After a write the record is `{n, n, false}` and the next read is in sync.
    #[test]
    fn prop_write_clears_drift(
        name in arb_label(),
        observed in arb_replicas(),
        requested in arb_replicas(),
        prior in proptest::option::of(arb_replicas()),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, directory, store) = harness("apps", &name, observed);
            if let Some(prior) = prior {
                store.seed("apps", &name, CacheRecord::reconciled(prior, observed));
            }

            let written = to_case(engine.write_replicas("apps", &name, requested).await)?;
            prop_assert_eq!(written.previous_desired, prior.unwrap_or(0));
            prop_assert_eq!(written.observed_before_patch, observed);
            prop_assert!(!written.drift);
            prop_assert_eq!(directory.replicas("apps", &name), Some(requested));
            prop_assert_eq!(store.record("apps", &name), Some(CacheRecord::accepted(requested)));

            let writes = store.writes();
            let view = to_case(engine.read_replicas("apps", &name).await)?;
            prop_assert_eq!(view.outcome, ReadOutcome::InSync);
            prop_assert_eq!(store.writes(), writes);
            Ok(())
        })?;
    }

    /// An unknown workload fails both operations without touching the store.
    #[test]
    fn prop_missing_workload_leaves_store_untouched(
        name in arb_label(),
        requested in arb_replicas(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, directory, store) = harness("apps", "present", 1);
            let missing = format!("{}-missing", name);

            let read = engine.read_replicas("apps", &missing).await;
            prop_assert!(read.is_err_and(|e| e.is_not_found()));
            let write = engine.write_replicas("apps", &missing, requested).await;
            prop_assert!(write.is_err_and(|e| e.is_not_found()));

            prop_assert_eq!(directory.calls(DirectoryOp::Patch), 0);
            prop_assert!(store.is_empty());
            Ok(())
        })?;
    }
}
