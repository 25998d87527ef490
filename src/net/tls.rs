//! TLS configuration and certificate loading.
//!
//! Certificates and keys are PEM files supplied by the operator. When the configured
//! Diffie-Hellman parameter file exists the listener switches to a hardened profile:
//! ECDHE-only AEAD suites and the prime256v1 curve. rustls never speaks anything older
//! than TLS 1.2, so legacy protocol versions are off in both profiles.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::CipherSuite;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;

/// Error type for TLS setup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0:?}")]
    MissingCertificate(PathBuf),

    #[error("Private key file not found: {0:?}")]
    MissingKey(PathBuf),

    #[error("No certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("No private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Which set of cipher suites and key exchange groups the listener offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherProfile {
    /// The ring provider's defaults.
    Standard,
    /// ECDHE + AES-GCM / CHACHA20 over prime256v1 only.
    Hardened,
}

const HARDENED_SUITES: &[CipherSuite] = &[
    CipherSuite::TLS13_AES_256_GCM_SHA384,
    CipherSuite::TLS13_AES_128_GCM_SHA256,
    CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
];

fn open(path: &Path, missing: fn(PathBuf) -> TlsError) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            missing(path.to_path_buf())
        } else {
            TlsError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Load every certificate in a PEM file, leaf first.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path, TlsError::MissingCertificate)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Load the first private key (PKCS#1, PKCS#8 or SEC1) in a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path, TlsError::MissingKey)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

/// The ring provider narrowed to the hardened suites and curve.
pub fn hardened_provider() -> CryptoProvider {
    let base = ring::default_provider();
    CryptoProvider {
        cipher_suites: base
            .cipher_suites
            .iter()
            .copied()
            .filter(|suite| HARDENED_SUITES.contains(&suite.suite()))
            .collect(),
        kx_groups: vec![ring::kx_group::SECP256R1],
        ..base
    }
}

/// Pick the profile for a TLS config: hardened iff the DH parameter file exists.
pub fn cipher_profile(tls: &TlsConfig) -> CipherProfile {
    if tls.dh_params_path.exists() {
        CipherProfile::Hardened
    } else {
        CipherProfile::Standard
    }
}

/// Build the rustls server configuration.
pub fn server_config(tls: &TlsConfig) -> Result<(rustls::ServerConfig, CipherProfile), TlsError> {
    let certs = load_certs(&tls.cert_path)?;
    let key = load_private_key(&tls.key_path)?;

    let profile = cipher_profile(tls);
    let provider = match profile {
        CipherProfile::Standard => ring::default_provider(),
        CipherProfile::Hardened => hardened_provider(),
    };

    let mut config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok((config, profile))
}

/// Build the acceptor used to wrap every accepted TCP stream.
pub fn build_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor, TlsError> {
    let (config, profile) = server_config(tls)?;
    tracing::info!(
        cert_path = ?tls.cert_path,
        profile = ?profile,
        "TLS configured"
    );
    Ok(TlsAcceptor::from(Arc::new(config)))
}
