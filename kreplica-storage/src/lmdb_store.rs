//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped,
//! persistent key-value store on the local host. Suitable for a single server
//! instance; records are not visible to other hosts.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `exists` and `get`
//! - One write transaction per `set`

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use kreplica_core::{CacheStore, ReplicaError, ReplicaResult, WorkloadKey};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for ReplicaError {
    fn from(e: LmdbStoreError) -> Self {
        ReplicaError::upstream(e.to_string())
    }
}

/// Cache store persisted in a local LMDB environment.
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open (or create) the store under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` does not fit in bytes
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbStoreError::EnvOpen(format!("map size of {} MB is too large", max_size_mb))
        })?;
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process; it is
        // not opened twice within one process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    fn read(&self, key: &WorkloadKey) -> Result<Option<Vec<u8>>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let value = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(value.map(|bytes| bytes.to_vec()))
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn exists(&self, key: &WorkloadKey) -> ReplicaResult<bool> {
        Ok(self.read(key)?.is_some())
    }

    async fn get(&self, key: &WorkloadKey) -> ReplicaResult<Option<Vec<u8>>> {
        Ok(self.read(key)?)
    }

    async fn set(&self, key: &WorkloadKey, value: &[u8]) -> ReplicaResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kreplica_core::CacheRecord;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbCacheStore::open(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() -> ReplicaResult<()> {
        let (store, _temp_dir) = create_test_store();
        let key = WorkloadKey::new("test", "app0");
        let record = CacheRecord::accepted(5);

        store.set(&key, &record.to_bytes()?).await?;

        assert!(store.exists(&key).await?);
        let bytes = store.get(&key).await?.expect("record should be present");
        assert_eq!(CacheRecord::from_bytes(&bytes)?, record);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_nonexistent() -> ReplicaResult<()> {
        let (store, _temp_dir) = create_test_store();
        let key = WorkloadKey::new("test", "missing");

        assert!(!store.exists(&key).await?);
        assert!(store.get(&key).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite() -> ReplicaResult<()> {
        let (store, _temp_dir) = create_test_store();
        let key = WorkloadKey::new("ns", "web");

        store.set(&key, &CacheRecord::reconciled(0, 3).to_bytes()?).await?;
        store.set(&key, &CacheRecord::accepted(3).to_bytes()?).await?;

        let bytes = store.get(&key).await?.expect("record should be present");
        assert_eq!(CacheRecord::from_bytes(&bytes)?, CacheRecord::accepted(3));
        Ok(())
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let result = LmdbCacheStore::open(temp_dir.path(), usize::MAX);
        assert!(matches!(result, Err(LmdbStoreError::EnvOpen(_))));
    }
}
