//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fileserver_requests_total` (counter): requests by method, route, status
//! - `fileserver_transfer_bytes_total` (counter): file bytes moved, by direction
//! - `fileserver_connections_total` (counter): accepted connections, by outcome
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one answered request. `method` must come from a fixed set.
pub fn record_request(method: &'static str, route: &'static str, status: u16) {
    counter!(
        "fileserver_requests_total",
        "method" => method,
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count file bytes moved. `direction` is `upload` or `download`.
pub fn record_transfer(direction: &'static str, bytes: u64) {
    counter!("fileserver_transfer_bytes_total", "direction" => direction).increment(bytes);
}

/// Count one accepted connection. `outcome` is `served`, `handshake_failed` or `dropped`.
pub fn record_connection(outcome: &'static str) {
    counter!("fileserver_connections_total", "outcome" => outcome).increment(1);
}
