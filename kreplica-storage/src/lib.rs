//! kreplica storage - cache state store backends
//!
//! Implementations of [`kreplica_core::CacheStore`]:
//! - [`RedisCacheStore`]: shared store for multi-instance deployments
//! - [`LmdbCacheStore`]: persistent store local to one host
//! - [`InMemoryCacheStore`]: process-local store for development and tests

pub mod lmdb_store;
pub mod memory;
pub mod redis_store;

pub use lmdb_store::{LmdbCacheStore, LmdbStoreError};
pub use memory::InMemoryCacheStore;
pub use redis_store::{RedisCacheStore, RedisConfig, RedisStoreError, RedisTlsConfig};
