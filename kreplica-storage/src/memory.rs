//! In-process cache store.
//!
//! Backs single-instance development runs and tests. State is lost on restart
//! and is not shared between processes.

use async_trait::async_trait;
use dashmap::DashMap;
use kreplica_core::{CacheStore, ReplicaResult, WorkloadKey};

/// Cache store held in a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw bytes stored under `key`, bypassing the trait.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store raw bytes under `key`, bypassing the trait.
    pub fn insert_raw(&self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), value);
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn exists(&self, key: &WorkloadKey) -> ReplicaResult<bool> {
        Ok(self.entries.contains_key(key.as_str()))
    }

    async fn get(&self, key: &WorkloadKey) -> ReplicaResult<Option<Vec<u8>>> {
        Ok(self.raw(key.as_str()))
    }

    async fn set(&self, key: &WorkloadKey, value: &[u8]) -> ReplicaResult<()> {
        self.entries.insert(key.as_str().to_string(), value.to_vec());
        Ok(())
    }
}
