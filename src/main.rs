//! TLS file server
//!
//! Serves a small HTML front end plus resumable multipart uploads and chunked
//! downloads over HTTPS.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──TLS──▶ net::Listener ──▶ http::server (one task per connection)
//!                                          │
//!                                          ▼
//!                                   http::reader → http::request
//!                                          │
//!                                          ▼
//!                                   http::handlers (method gate, routing)
//!                                    │            │              │
//!                                    ▼            ▼              ▼
//!                               pages/list   transfer::upload  transfer::download
//!                                    │            │              │
//!                                    └────────────┴──────▶ storage (user root)
//!
//!     Cross-cutting: config, observability, resilience (timeouts), lifecycle
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tls_fileserver::config::{load_config, validate_config, ConfigError, LogFormat, ServerConfig};
use tls_fileserver::http::HttpServer;
use tls_fileserver::lifecycle::{spawn_signal_handler, Shutdown};
use tls_fileserver::net::{build_acceptor, Listener};
use tls_fileserver::observability::{init_logging, init_metrics};
use tls_fileserver::storage::Storage;

#[derive(Parser)]
#[command(name = "tls-fileserver")]
#[command(about = "HTTPS file server with resumable uploads", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8443
    #[arg(long)]
    bind: Option<String>,

    /// PEM certificate chain
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    key: Option<PathBuf>,

    /// DH parameter file; its presence enables the hardened cipher profile
    #[arg(long)]
    dh_params: Option<PathBuf>,

    /// Work directory holding user files and the favicon
    #[arg(long)]
    root: Option<PathBuf>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(cert) = &self.cert {
            config.listener.tls.cert_path = cert.clone();
        }
        if let Some(key) = &self.key {
            config.listener.tls.key_path = key.clone();
        }
        if let Some(dh_params) = &self.dh_params {
            config.listener.tls.dh_params_path = dh_params.clone();
        }
        if let Some(root) = &self.root {
            config.storage.work_dir = root.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format.into();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tls-fileserver starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        work_dir = ?config.storage.work_dir,
        chunk_size = config.limits.chunk_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let storage = Storage::new(&config.storage);
    storage.ensure_layout().await?;
    tracing::info!(user_root = ?storage.user_root(), "Storage ready");

    let acceptor = build_acceptor(&config.listener.tls)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, acceptor);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
