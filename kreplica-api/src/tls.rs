//! Server TLS with mandatory client certificates.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;

use crate::error::{ApiError, ApiResult};

/// PEM files for the mTLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA bundle that client certificates must chain to.
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Make ring the process-wide rustls provider.
///
/// Several dependencies build rustls configs with the default builder, which
/// needs exactly one installed provider. Repeated calls are harmless.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build a rustls server config that requires and verifies client certificates.
pub fn server_config(material: &TlsMaterial) -> ApiResult<rustls::ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(load_certs(&material.ca)?);
    if added == 0 {
        return Err(tls_error(&material.ca, "no usable CA certificates"));
    }
    if ignored > 0 {
        tracing::warn!(path = %material.ca.display(), ignored, "Skipped unparsable CA certificates");
    }

    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| tls_error(&material.ca, e))?;

    let certs = load_certs(&material.cert)?;
    if certs.is_empty() {
        return Err(tls_error(&material.cert, "no certificates found"));
    }
    let key = load_key(&material.key)?;

    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ApiError::internal_error(format!("TLS protocol setup failed: {}", e)))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .map_err(|e| tls_error(&material.key, e))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn open(path: &Path) -> ApiResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| tls_error(path, e))
}

fn load_certs(path: &Path) -> ApiResult<Vec<CertificateDer<'static>>> {
    let mut reader = open(path)?;
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(path, e))
}

fn load_key(path: &Path) -> ApiResult<PrivateKeyDer<'static>> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| tls_error(path, e))?
        .ok_or_else(|| tls_error(path, "no private key found"))
}

fn tls_error(path: &Path, detail: impl std::fmt::Display) -> ApiError {
    ApiError::internal_error(format!("TLS material {}: {}", path.display(), detail))
}
