//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the TLS handshake, the header read and every streaming read/write
//! - Keep timeout errors distinct from other I/O errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - `None` means "no deadline"; `0` in the config maps to `None`

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A bounded operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

impl From<TimedOut> for std::io::Error {
    fn from(err: TimedOut) -> Self {
        std::io::Error::new(std::io::ErrorKind::TimedOut, err)
    }
}

/// Await `fut`, giving up after `limit` if one is set.
pub async fn with_timeout<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TimedOut(limit)),
        None => Ok(fut.await),
    }
}
