//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the file server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the file server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Size limits and transfer chunking.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// On-disk layout of served and uploaded files.
    pub storage: StorageConfig,

    /// Public-facing site settings.
    pub site: SiteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Base URL used by redirect pages.
    ///
    /// Falls back to `https://<bind_address>` when no public URL is configured.
    pub fn public_url(&self) -> String {
        match &self.site.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.listener.bind_address),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8443").
    pub bind_address: String,

    /// TLS material.
    pub tls: TlsConfig,

    /// Maximum connections processed at once.
    /// `1` serves connections strictly one after another.
    pub max_connections: usize,

    /// Pending-connection queue length passed to `listen(2)`.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8443".to_string(),
            tls: TlsConfig::default(),
            max_connections: 1,
            backlog: 1,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// Diffie-Hellman parameter file. When it exists the hardened cipher profile is used.
    pub dh_params_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
            dh_params_path: PathBuf::from("dhparam.pem"),
        }
    }
}

/// Request size limits and streaming chunk size.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of request line plus header block.
    pub max_header_bytes: usize,

    /// Maximum size of a multipart part header.
    pub max_part_header_bytes: usize,

    /// Maximum size of a url-encoded form body.
    pub max_form_bytes: usize,

    /// Bytes moved per socket read/write while streaming files.
    pub chunk_size: usize,

    /// Unread body bytes discarded before answering a rejected upload.
    pub max_drain_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 16 * 1024,
            max_part_header_bytes: 8 * 1024,
            max_form_bytes: 64 * 1024,
            chunk_size: 8192,
            max_drain_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration. A value of `0` disables the timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TLS handshake timeout in seconds.
    pub handshake_secs: u64,

    /// Time allowed to receive the complete request header block.
    pub header_secs: u64,

    /// Maximum silence on a single read or write while streaming.
    pub idle_secs: u64,

    /// How long shutdown waits for in-flight connections.
    pub drain_secs: u64,
}

impl TimeoutConfig {
    pub fn handshake(&self) -> Option<Duration> {
        non_zero_secs(self.handshake_secs)
    }

    pub fn header(&self) -> Option<Duration> {
        non_zero_secs(self.header_secs)
    }

    pub fn idle(&self) -> Option<Duration> {
        non_zero_secs(self.idle_secs)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handshake_secs: 10,
            header_secs: 30,
            idle_secs: 60,
            drain_secs: 30,
        }
    }
}

/// Storage layout: `<work_dir>/<user_dir>/<user>/` holds user files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of everything the server reads or writes.
    pub work_dir: PathBuf,

    /// Directory below `work_dir` holding per-user directories.
    pub user_dir: String,

    /// The single user every request acts as.
    pub user: String,

    /// Favicon path relative to `work_dir`.
    pub favicon: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./wwwdata"),
            user_dir: "userdata".to_string(),
            user: "guest".to_string(),
            favicon: PathBuf::from("images/favicon_server_32x32.ico"),
        }
    }
}

/// Public-facing site settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// URL clients use to reach the server, e.g. "https://files.example.org".
    pub public_url: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
