//! Redis-backed cache store.
//!
//! Records are plain `SET` values with no expiry, so several server instances
//! can share one Redis and any other process can inspect the JSON directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kreplica_core::{CacheStore, ReplicaError, ReplicaResult, WorkloadKey};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

/// Error type for Redis store setup and commands.
#[derive(Debug, thiserror::Error)]
pub enum RedisStoreError {
    /// Failed to read TLS material from disk.
    #[error("Failed to read {path}: {source}")]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Redis client or command failure.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<RedisStoreError> for ReplicaError {
    fn from(e: RedisStoreError) -> Self {
        ReplicaError::upstream(e.to_string())
    }
}

/// Client certificate material for mutual TLS with Redis.
#[derive(Debug, Clone)]
pub struct RedisTlsConfig {
    /// CA used to verify the server. Without it the server certificate is not verified.
    pub ca_cert: Option<PathBuf>,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

/// Connection settings for [`RedisCacheStore`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub address: String,
    pub tls: Option<RedisTlsConfig>,
}

impl RedisConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: RedisTlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Connection URL for the configured address, database 0.
    pub fn url(&self) -> String {
        match &self.tls {
            None => format!("redis://{}/0", self.address),
            Some(tls) if tls.ca_cert.is_some() => format!("rediss://{}/0", self.address),
            Some(_) => format!("rediss://{}/0#insecure", self.address),
        }
    }
}

/// Cache store over a multiplexed async Redis connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self, RedisStoreError> {
        let client = match &config.tls {
            None => redis::Client::open(config.url())?,
            Some(tls) => {
                if tls.ca_cert.is_none() {
                    warn!(
                        address = %config.address,
                        "No Redis CA configured, server certificate will not be verified"
                    );
                }
                let certs = redis::TlsCertificates {
                    client_tls: Some(redis::ClientTlsConfig {
                        client_cert: read_pem(&tls.client_cert)?,
                        client_key: read_pem(&tls.client_key)?,
                    }),
                    root_cert: tls.ca_cert.as_deref().map(read_pem).transpose()?,
                };
                redis::Client::build_with_tls(config.url(), certs)?
            }
        };

        let mut conn = client.get_multiplexed_async_connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!(address = %config.address, tls = config.tls.is_some(), "Connected to Redis");
        Ok(Self { conn })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, RedisStoreError> {
    std::fs::read(path).map_err(|source| RedisStoreError::TlsMaterial {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn exists(&self, key: &WorkloadKey) -> ReplicaResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn
            .exists(key.as_str())
            .await
            .map_err(RedisStoreError::from)?;
        Ok(found)
    }

    async fn get(&self, key: &WorkloadKey) -> ReplicaResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key.as_str())
            .await
            .map_err(RedisStoreError::from)?;
        Ok(value)
    }

    async fn set(&self, key: &WorkloadKey, value: &[u8]) -> ReplicaResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(key.as_str(), value)
            .await
            .map_err(RedisStoreError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls(ca: Option<&str>) -> RedisTlsConfig {
        RedisTlsConfig {
            ca_cert: ca.map(PathBuf::from),
            client_cert: PathBuf::from("/certs/client.crt"),
            client_key: PathBuf::from("/certs/client.key"),
        }
    }

    #[test]
    fn test_plain_url() {
        let config = RedisConfig::new("localhost:6379");
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_tls_url_with_ca() {
        let config = RedisConfig::new("redis.internal:6380").with_tls(tls(Some("/certs/ca.crt")));
        assert_eq!(config.url(), "rediss://redis.internal:6380/0");
    }

    #[test]
    fn test_tls_url_without_ca_skips_verification() {
        let config = RedisConfig::new("redis.internal:6380").with_tls(tls(None));
        assert_eq!(config.url(), "rediss://redis.internal:6380/0#insecure");
    }

    #[tokio::test]
    async fn test_missing_client_cert_is_reported() {
        let config = RedisConfig::new("localhost:6379").with_tls(RedisTlsConfig {
            ca_cert: None,
            client_cert: PathBuf::from("/nonexistent/kreplica/client.crt"),
            client_key: PathBuf::from("/nonexistent/kreplica/client.key"),
        });
        match RedisCacheStore::connect(&config).await {
            Err(RedisStoreError::TlsMaterial { path, .. }) => {
                assert!(path.ends_with("client.crt"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connect should fail without certificates"),
        }
    }

    #[test]
    fn test_error_maps_to_upstream() {
        let err: ReplicaError = RedisStoreError::TlsMaterial {
            path: PathBuf::from("/x"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert_eq!(err.kind, kreplica_core::ErrorKind::Upstream);
        assert_eq!(err.http_status(), 500);
    }
}
