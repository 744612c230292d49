//! Server Bootstrap
//!
//! Builds the collaborators named by [`ServerConfig`], assembles the router,
//! and serves it over mTLS (or plain HTTP with `--insecure-http`) until
//! Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use kreplica_core::{CacheStore, ReplicaReconciler, WorkloadDirectory};
use kreplica_kube::{ClusterConfig, KubeWorkloadDirectory};
use kreplica_storage::{InMemoryCacheStore, LmdbCacheStore, RedisCacheStore};

use crate::config::{CacheBackend, ServerConfig};
use crate::error::{ApiError, ApiResult};
use crate::routes::create_api_router;
use crate::state::AppState;
use crate::tls;

/// Time allowed for in-flight requests to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Connect to the Kubernetes API server.
pub fn build_directory(config: &ServerConfig) -> ApiResult<Arc<dyn WorkloadDirectory>> {
    let loaded = if config.local {
        let path = config.kubeconfig_path()?;
        tracing::info!(kubeconfig = %path.display(), "Using kubeconfig");
        ClusterConfig::from_kubeconfig(&path)
    } else {
        tracing::info!("Using in-cluster service account");
        ClusterConfig::in_cluster()
    };
    let cluster = loaded
        .map_err(|e| ApiError::internal_error(format!("Kubernetes configuration: {}", e)))?;

    let directory = KubeWorkloadDirectory::new(&cluster, config.request_deadline())
        .map_err(|e| ApiError::internal_error(format!("Kubernetes client: {}", e)))?;
    tracing::info!(server = %directory.base_url(), "Kubernetes client ready");
    Ok(Arc::new(directory))
}

/// Open the configured cache store.
pub async fn build_store(config: &ServerConfig) -> ApiResult<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Redis => {
            let redis = config.redis_config()?;
            let store = RedisCacheStore::connect(&redis)
                .await
                .map_err(|e| ApiError::internal_error(format!("Redis: {}", e)))?;
            Arc::new(store)
        }
        CacheBackend::Lmdb => {
            let store = LmdbCacheStore::open(&config.lmdb_path, config.lmdb_max_size_mb)
                .map_err(|e| ApiError::internal_error(format!("LMDB: {}", e)))?;
            tracing::info!(path = %config.lmdb_path.display(), "LMDB cache store opened");
            Arc::new(store)
        }
        CacheBackend::Memory => {
            tracing::warn!("Using in-memory cache store; state is lost on restart");
            Arc::new(InMemoryCacheStore::new())
        }
    };
    Ok(store)
}

/// Build state from config, then serve until shutdown.
pub async fn run(config: ServerConfig) -> ApiResult<()> {
    tls::install_crypto_provider();

    let tls_config = match config.tls_material()? {
        Some(material) => Some(tls::server_config(&material)?),
        None => {
            tracing::warn!("--insecure-http set; serving plain HTTP without client authentication");
            None
        }
    };

    let directory = build_directory(&config)?;
    let store = build_store(&config).await?;
    let state = AppState::new(ReplicaReconciler::new(directory, store));
    let app = create_api_router(state, config.request_deadline());

    let addr = config.bind_addr();
    let handle = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    tracing::info!(%addr, version = crate::state::APPLICATION_VERSION, mtls = tls_config.is_some(), "Starting kreplica server");

    let served = match tls_config {
        Some(tls_config) => {
            axum_server::bind_rustls(addr, RustlsConfig::from_config(Arc::new(tls_config)))
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };
    served.map_err(|e| ApiError::internal_error(format!("Server error on {}: {}", addr, e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
