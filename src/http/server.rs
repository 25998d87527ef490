//! TLS accept loop and per-connection pipeline.
//!
//! # Responsibilities
//! - Accept TCP connections within the connection limit
//! - Run the TLS handshake under a timeout
//! - Read, parse and dispatch exactly one request per connection
//! - Close the connection on every exit path
//! - Stop on shutdown and drain in-flight connections
//!
//! # Design Decisions
//! - One task per connection; all request state is local to that task
//! - No error in one connection stops the accept loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::http::handlers::dispatch;
use crate::http::reader::{read_request_head, ReadError};
use crate::http::request::{ParseError, Request};
use crate::lifecycle::ShutdownSignal;
use crate::net::{Connection, ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::resilience::{with_timeout, TimedOut};
use crate::routing::RouteTable;
use crate::storage::Storage;
use crate::transfer::UploadError;

/// Error type for one connection's request/response cycle.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("TLS handshake failed: {0}")]
    Handshake(std::io::Error),

    #[error("TLS handshake: {0}")]
    HandshakeTimeout(TimedOut),

    #[error("request read failed: {0}")]
    Read(#[from] ReadError),

    #[error("request dropped: {0}")]
    Parse(#[from] ParseError),

    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload aborted: {0}")]
    Upload(UploadError),
}

impl ConnectionError {
    /// Peer connected and left without sending anything.
    pub fn is_silent_close(&self) -> bool {
        matches!(self, ConnectionError::Read(ReadError::Closed { received: 0 }))
    }
}

/// Everything a request handler may read. Shared by all connection tasks.
#[derive(Debug)]
pub struct AppContext {
    config: ServerConfig,
    storage: Storage,
    routes: RouteTable,
    public_url: String,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            storage: Storage::new(&config.storage),
            routes: RouteTable::standard(),
            public_url: config.public_url(),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Base URL used in redirect pages.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn list_url(&self) -> String {
        format!("{}/list", self.public_url)
    }
}

/// HTTPS file server.
pub struct HttpServer {
    ctx: Arc<AppContext>,
    acceptor: TlsAcceptor,
    tracker: ConnectionTracker,
}

impl HttpServer {
    pub fn new(config: ServerConfig, acceptor: TlsAcceptor) -> Self {
        Self {
            ctx: Arc::new(AppContext::new(config)),
            acceptor,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle for observing in-flight connections.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            public_url = %self.ctx.public_url(),
            routes = self.ctx.routes().entries().len(),
            "HTTPS server starting"
        );

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    tracing::info!("Shutdown requested; no longer accepting");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            let (tcp, peer, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                Err(err) => {
                    tracing::warn!(error = %err, "Accept failed; continuing");
                    continue;
                }
            };

            let guard = self.tracker.track();
            let id = guard.id();
            let ctx = Arc::clone(&self.ctx);
            let acceptor = self.acceptor.clone();
            let span = tracing::info_span!("connection", connection_id = %id, peer_addr = %peer);

            tokio::spawn(
                async move {
                    let _permit = permit;
                    let _guard = guard;
                    handle_connection(acceptor, tcp, id, peer, &ctx).await;
                }
                .instrument(span),
            );
        }

        let drain = self.ctx.config().timeouts.drain();
        if tokio::time::timeout(drain, self.tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                drain_secs = drain.as_secs(),
                "Drain timed out; abandoning connections"
            );
        }

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

async fn handshake(
    acceptor: &TlsAcceptor,
    tcp: TcpStream,
    ctx: &AppContext,
) -> Result<TlsStream<TcpStream>, ConnectionError> {
    match with_timeout(ctx.config().timeouts.handshake(), acceptor.accept(tcp)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(err)) => Err(ConnectionError::Handshake(err)),
        Err(elapsed) => Err(ConnectionError::HandshakeTimeout(elapsed)),
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    tcp: TcpStream,
    id: ConnectionId,
    peer: SocketAddr,
    ctx: &AppContext,
) {
    let stream = match handshake(&acceptor, tcp, ctx).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::debug!(error = %err, "Dropping connection");
            metrics::record_connection("handshake_failed");
            return;
        }
    };

    let mut connection = Connection::new(id, peer, stream);
    match serve_connection(&mut connection, ctx).await {
        Ok(()) => metrics::record_connection("served"),
        Err(err) if err.is_silent_close() => {
            tracing::debug!("Peer closed without sending a request");
            metrics::record_connection("dropped");
        }
        Err(err) => {
            tracing::warn!(error = %err, "Connection aborted");
            metrics::record_connection("dropped");
        }
    }
}

/// Serve exactly one request on `connection`, then close it.
pub async fn serve_connection<S>(
    connection: &mut Connection<S>,
    ctx: &AppContext,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let result = handle_request(connection.stream_mut(), ctx).await;

    // Best effort: the peer may already be gone.
    let idle = ctx.config().timeouts.idle();
    if let Ok(Err(err)) = with_timeout(idle, connection.stream_mut().shutdown()).await {
        tracing::trace!(error = %err, "Shutdown after response failed");
    }
    tracing::debug!(
        connection_id = %connection.id(),
        peer_addr = %connection.peer(),
        ok = result.is_ok(),
        "Connection closed"
    );
    result
}

async fn handle_request<S>(stream: &mut S, ctx: &AppContext) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = ctx.config();
    let raw = read_request_head(
        stream,
        config.limits.max_header_bytes,
        config.timeouts.header(),
        config.timeouts.idle(),
    )
    .await?;

    let request = Request::parse(&raw.head, raw.body)?;
    let method_label = request.method.metric_label();
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method,
        path = %request.path,
    );

    async move {
        let started = Instant::now();
        let (route, status) = dispatch(stream, request, ctx).await?;
        match status {
            Some(status) => {
                metrics::record_request(method_label, route, status.code());
                tracing::info!(
                    route,
                    status = status.code(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request completed"
                );
            }
            None => tracing::info!(route, "Request completed without a response"),
        }
        Ok::<(), ConnectionError>(())
    }
    .instrument(span)
    .await
}
