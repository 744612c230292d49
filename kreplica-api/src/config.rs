//! Server Configuration
//!
//! Command-line flags with `KREPLICA_*` environment fallbacks. Parsed once in
//! the binary and passed down; nothing reads the environment afterwards.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kreplica_storage::{RedisConfig, RedisTlsConfig};

use crate::error::{ApiError, ApiResult};
use crate::tls::TlsMaterial;

/// Which cache store backs the reconciliation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Shared Redis server.
    Redis,
    /// LMDB environment on local disk.
    Lmdb,
    /// Process memory. Lost on restart.
    Memory,
}

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kreplica-server",
    version,
    about = "Reconciles deployment replica counts between Kubernetes and a cache store"
)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "KREPLICA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "KREPLICA_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// CA bundle used to verify client certificates.
    #[arg(long, env = "KREPLICA_TLS_CA")]
    pub ca: Option<PathBuf>,

    /// Server certificate chain (PEM).
    #[arg(long, env = "KREPLICA_TLS_CERT")]
    pub cert: Option<PathBuf>,

    /// Server private key (PEM).
    #[arg(long, env = "KREPLICA_TLS_KEY")]
    pub key: Option<PathBuf>,

    /// Serve plain HTTP without client authentication. Local testing only.
    #[arg(long, env = "KREPLICA_INSECURE_HTTP", conflicts_with_all = ["ca", "cert", "key"])]
    pub insecure_http: bool,

    /// Use a kubeconfig file instead of the in-cluster service account.
    #[arg(long, env = "KREPLICA_LOCAL")]
    pub local: bool,

    /// Kubeconfig path. Defaults to ~/.kube/config.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Cache store backend.
    #[arg(long, env = "KREPLICA_CACHE_BACKEND", value_enum, default_value_t = CacheBackend::Redis)]
    pub cache_backend: CacheBackend,

    /// Redis address as host:port.
    #[arg(long, env = "KREPLICA_REDIS_ADDR", default_value = "localhost:6379")]
    pub raddr: String,

    /// CA used to verify the Redis server.
    #[arg(long, env = "KREPLICA_REDIS_CA")]
    pub rca: Option<PathBuf>,

    /// Client certificate presented to Redis.
    #[arg(long, env = "KREPLICA_REDIS_CERT")]
    pub rcert: Option<PathBuf>,

    /// Client key presented to Redis.
    #[arg(long, env = "KREPLICA_REDIS_KEY")]
    pub rkey: Option<PathBuf>,

    /// LMDB directory, for `--cache-backend lmdb`.
    #[arg(long, env = "KREPLICA_LMDB_PATH", default_value = "./kreplica-cache")]
    pub lmdb_path: PathBuf,

    /// LMDB map size in megabytes.
    #[arg(long, env = "KREPLICA_LMDB_MAX_SIZE_MB", default_value_t = 64)]
    pub lmdb_max_size_mb: usize,

    /// Seconds allowed for reading a request.
    #[arg(long, env = "KREPLICA_READ_TIMEOUT_SECS", default_value_t = 10)]
    pub read_timeout_secs: u64,

    /// Seconds allowed for writing a response.
    #[arg(long, env = "KREPLICA_WRITE_TIMEOUT_SECS", default_value_t = 15)]
    pub write_timeout_secs: u64,

    /// Log at debug level.
    #[arg(short, long, env = "KREPLICA_VERBOSE")]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Deadline applied to each request, covering every upstream call it makes.
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.saturating_add(self.write_timeout_secs))
    }

    /// Server TLS material. `None` only with `--insecure-http`.
    ///
    /// All three of `--ca`, `--cert` and `--key` are required otherwise.
    pub fn tls_material(&self) -> ApiResult<Option<TlsMaterial>> {
        match (&self.ca, &self.cert, &self.key) {
            (Some(ca), Some(cert), Some(key)) => Ok(Some(TlsMaterial {
                ca: ca.clone(),
                cert: cert.clone(),
                key: key.clone(),
            })),
            (None, None, None) if self.insecure_http => Ok(None),
            _ => Err(ApiError::internal_error(
                "--ca, --cert and --key are required (use --insecure-http to serve without TLS)",
            )),
        }
    }

    /// Redis connection settings.
    pub fn redis_config(&self) -> ApiResult<RedisConfig> {
        let config = RedisConfig::new(self.raddr.clone());
        match (&self.rcert, &self.rkey) {
            (Some(cert), Some(key)) => Ok(config.with_tls(RedisTlsConfig {
                ca_cert: self.rca.clone(),
                client_cert: cert.clone(),
                client_key: key.clone(),
            })),
            (None, None) if self.rca.is_none() => Ok(config),
            _ => Err(ApiError::internal_error(
                "--rcert and --rkey must be set together to enable Redis TLS",
            )),
        }
    }

    /// Kubeconfig to load when running with `--local`.
    pub fn kubeconfig_path(&self) -> ApiResult<PathBuf> {
        self.kubeconfig
            .clone()
            .or_else(kreplica_kube::default_kubeconfig_path)
            .ok_or_else(|| {
                ApiError::internal_error("no kubeconfig given and $HOME is not set")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["kreplica-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.request_deadline(), Duration::from_secs(25));
        assert!(!config.local);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--port",
            "9443",
            "--bind",
            "127.0.0.1",
            "--cache-backend",
            "memory",
            "--read-timeout-secs",
            "1",
            "--write-timeout-secs",
            "2",
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9443".parse().unwrap());
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.request_deadline(), Duration::from_secs(3));
    }

    #[test]
    fn test_tls_flags_must_be_complete() {
        let config = parse(&["--ca", "ca.pem", "--cert", "server.pem"]);
        assert!(config.tls_material().is_err());

        let config = parse(&["--ca", "ca.pem", "--cert", "server.pem", "--key", "server.key"]);
        let material = config.tls_material().unwrap().unwrap();
        assert_eq!(material.key, PathBuf::from("server.key"));
    }

    #[test]
    fn test_tls_is_required_by_default() {
        let config = parse(&[]);
        assert!(!config.insecure_http);
        let err = config.tls_material().unwrap_err();
        assert!(err.message.contains("--insecure-http"));
    }

    #[test]
    fn test_insecure_http_is_explicit_opt_in() {
        let config = parse(&["--insecure-http"]);
        assert_eq!(config.tls_material().unwrap(), None);

        let conflicting =
            ServerConfig::try_parse_from(["kreplica-server", "--insecure-http", "--ca", "ca.pem"]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn test_redis_tls_requires_cert_and_key() {
        let config = parse(&["--rca", "ca.pem"]);
        assert!(config.redis_config().is_err());

        let config = parse(&["--raddr", "redis:6380", "--rcert", "c.pem", "--rkey", "k.pem"]);
        let redis = config.redis_config().unwrap();
        assert_eq!(redis.address, "redis:6380");
        assert!(redis.tls.is_some());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = ServerConfig::try_parse_from(["kreplica-server", "--cache-backend", "etcd"]);
        assert!(result.is_err());
    }
}
