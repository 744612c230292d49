//! Cluster connection settings.
//!
//! Two sources are supported: the service account mounted into a pod
//! (in-cluster) and a kubeconfig file on disk. Both resolve to a
//! [`ClusterConfig`], which knows how to build a TLS-configured HTTP client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;

use crate::error::KubeError;

/// Directory holding the projected service account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Resolved API server endpoint and credentials.
#[derive(Clone, Default)]
pub struct ClusterConfig {
    /// API server base URL, e.g. `https://10.0.0.1:443`.
    pub server: String,
    /// PEM bundle used to verify the API server.
    pub ca_pem: Option<Vec<u8>>,
    /// PEM client certificate followed by its private key.
    pub identity_pem: Option<Vec<u8>>,
    /// Bearer token.
    pub token: Option<String>,
    /// Skip server certificate verification.
    pub insecure_skip_tls_verify: bool,
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("server", &self.server)
            .field("ca_pem", &self.ca_pem.as_ref().map(|_| "[PEM]"))
            .field("identity_pem", &self.identity_pem.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

impl ClusterConfig {
    /// Load the pod's service account configuration.
    ///
    /// Requires `KUBERNETES_SERVICE_HOST` and `KUBERNETES_SERVICE_PORT`.
    pub fn in_cluster() -> Result<Self, KubeError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| KubeError::Config("KUBERNETES_SERVICE_HOST is not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| KubeError::Config("KUBERNETES_SERVICE_PORT is not set".into()))?;
        Self::from_service_account(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
    }

    /// Build an in-cluster configuration from explicit values.
    pub fn from_service_account(host: &str, port: &str, dir: &Path) -> Result<Self, KubeError> {
        let token = read_file(&dir.join("token"))?;
        let token = String::from_utf8_lossy(&token).trim().to_string();
        let ca_pem = read_file(&dir.join("ca.crt"))?;

        Ok(Self {
            server: format!("https://{}", join_host_port(host, port)),
            ca_pem: Some(ca_pem),
            identity_pem: None,
            token: Some(token),
            insecure_skip_tls_verify: false,
        })
    }

    /// Load the current context of a kubeconfig file.
    pub fn from_kubeconfig(path: &Path) -> Result<Self, KubeError> {
        let raw = read_file(path)?;
        let text = String::from_utf8_lossy(&raw);
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_kubeconfig_str(&text, base_dir)
    }

    /// Parse kubeconfig YAML. Relative file references resolve against `base_dir`.
    pub fn from_kubeconfig_str(yaml: &str, base_dir: &Path) -> Result<Self, KubeError> {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(yaml)?;

        let context_name = kubeconfig
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| KubeError::Config("kubeconfig has no current-context".into()))?;
        let context = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| {
                KubeError::Config(format!("context '{}' not found in kubeconfig", context_name))
            })?;
        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| {
                KubeError::Config(format!("cluster '{}' not found in kubeconfig", context.cluster))
            })?;
        let user = match context.user.as_deref() {
            Some(name) => kubeconfig
                .users
                .iter()
                .find(|u| u.name == name)
                .map(|u| u.user.clone())
                .ok_or_else(|| {
                    KubeError::Config(format!("user '{}' not found in kubeconfig", name))
                })?,
            None => AuthInfo::default(),
        };

        let ca_pem = inline_or_file(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
        )?;
        let cert_pem = inline_or_file(
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
            base_dir,
        )?;
        let key_pem = inline_or_file(
            user.client_key_data.as_deref(),
            user.client_key.as_deref(),
            base_dir,
        )?;

        let identity_pem = match (cert_pem, key_pem) {
            (Some(mut cert), Some(key)) => {
                if !cert.ends_with(b"\n") {
                    cert.push(b'\n');
                }
                cert.extend_from_slice(&key);
                Some(cert)
            }
            (None, None) => None,
            _ => {
                return Err(KubeError::Config(
                    "kubeconfig user must set both a client certificate and key".into(),
                ))
            }
        };

        let token = match (user.token, user.token_file) {
            (Some(token), _) => Some(token),
            (None, Some(file)) => {
                let raw = read_file(&resolve(base_dir, &file))?;
                Some(String::from_utf8_lossy(&raw).trim().to_string())
            }
            (None, None) => None,
        };

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            ca_pem,
            identity_pem,
            token,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        })
    }

    /// Build the HTTP client used for every API call.
    pub fn http_client(&self, timeout: Duration) -> Result<reqwest::Client, KubeError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(self.insecure_skip_tls_verify);

        if let Some(ca) = &self.ca_pem {
            for cert in reqwest::Certificate::from_pem_bundle(ca)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(identity) = &self.identity_pem {
            builder = builder.identity(reqwest::Identity::from_pem(identity)?);
        }

        Ok(builder.build()?)
    }
}

/// Default kubeconfig location: `$HOME/.kube/config`.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
}

// ============================================================================
// KUBECONFIG SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedAuthInfo>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Cluster {
    server: String,
    #[serde(default)]
    certificate_authority: Option<String>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: Context,
}

#[derive(Debug, Deserialize)]
struct Context {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedAuthInfo {
    name: String,
    #[serde(default)]
    user: AuthInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AuthInfo {
    #[serde(default)]
    client_certificate: Option<String>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<String>,
    #[serde(default)]
    client_key_data: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<String>,
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_file(path: &Path) -> Result<Vec<u8>, KubeError> {
    std::fs::read(path).map_err(|source| KubeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Inline base64 data wins over a file reference.
fn inline_or_file(
    data: Option<&str>,
    file: Option<&str>,
    base_dir: &Path,
) -> Result<Option<Vec<u8>>, KubeError> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| KubeError::Config(format!("invalid base64 in kubeconfig: {}", e)))?;
        return Ok(Some(decoded));
    }
    match file.filter(|f| !f.is_empty()) {
        Some(file) => read_file(&resolve(base_dir, file)).map(Some),
        None => Ok(None),
    }
}

fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
