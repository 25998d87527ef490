//! Reading requests off a raw byte stream.
//!
//! # Responsibilities
//! - Pull bytes until the `\r\n\r\n` header delimiter shows up, however the peer
//!   fragments its writes
//! - Bound memory per request (`limits.max_header_bytes`)
//! - Decode only the header region as text; bytes past the delimiter stay raw
//!   because they may already be the start of a binary upload

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resilience::{with_timeout, TimedOut};

/// Separates a header block from the body that follows it.
pub const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

const READ_SIZE: usize = 1024;

/// Error type for socket reads.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("peer closed the connection after {received} bytes")]
    Closed { received: usize },

    #[error("header block exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error(transparent)]
    TimedOut(#[from] TimedOut),

    #[error("socket read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A request line plus header block, and whatever body bytes arrived with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    /// Request line and headers, without the delimiter.
    pub head: String,
    /// Bytes read past the delimiter.
    pub body: Vec<u8>,
}

/// Position of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// One read into `buf`, bounded by `idle`.
pub async fn read_some<S>(
    stream: &mut S,
    buf: &mut [u8],
    idle: Option<Duration>,
) -> Result<usize, ReadError>
where
    S: AsyncRead + Unpin,
{
    Ok(with_timeout(idle, stream.read(buf)).await??)
}

/// Grow `buf` until it holds `\r\n\r\n` at or after `from`.
///
/// At most `limit` bytes past `from` are buffered. Returns the offset of the
/// delimiter's first byte.
pub async fn read_until_delimiter<S>(
    stream: &mut S,
    buf: &mut Vec<u8>,
    from: usize,
    limit: usize,
    idle: Option<Duration>,
) -> Result<usize, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut scanned = from.min(buf.len());
    let mut chunk = [0u8; READ_SIZE];

    loop {
        if let Some(pos) = find_subslice(&buf[scanned..], HEADER_DELIMITER) {
            return Ok(scanned + pos);
        }
        // The delimiter may straddle this read and the next one.
        scanned = buf
            .len()
            .saturating_sub(HEADER_DELIMITER.len() - 1)
            .max(from.min(buf.len()));

        let buffered = buf.len().saturating_sub(from);
        if buffered >= limit {
            return Err(ReadError::TooLarge { limit });
        }

        let want = (limit - buffered).min(READ_SIZE);
        let n = read_some(stream, &mut chunk[..want], idle).await?;
        if n == 0 {
            return Err(ReadError::Closed {
                received: buf.len(),
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Read a request line and header block.
///
/// `deadline` bounds the whole header read, `idle` each individual read.
pub async fn read_request_head<S>(
    stream: &mut S,
    max_header_bytes: usize,
    deadline: Option<Duration>,
    idle: Option<Duration>,
) -> Result<RawRequest, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_SIZE);
    let end = with_timeout(
        deadline,
        read_until_delimiter(stream, &mut buf, 0, max_header_bytes, idle),
    )
    .await??;

    let body = buf.split_off(end + HEADER_DELIMITER.len());
    buf.truncate(end);
    let head = String::from_utf8_lossy(&buf).into_owned();

    Ok(RawRequest { head, body })
}

/// Extend `body` until it holds `target` bytes or the peer stops sending.
pub async fn read_body_to<S>(
    stream: &mut S,
    body: &mut Vec<u8>,
    target: usize,
    idle: Option<Duration>,
) -> Result<(), ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_SIZE];
    while body.len() < target {
        let want = (target - body.len()).min(READ_SIZE);
        let n = read_some(stream, &mut chunk[..want], idle).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}
