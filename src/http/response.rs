//! Response building and writing.
//!
//! # Responsibilities
//! - Render the status line and the `Content-Type` / `Content-Length` header block
//! - Send whole-body responses with a single write
//! - Render the download header that precedes a streamed file
//!
//! # Design Decisions
//! - Content-Length is always the byte length of the body, never a character count
//! - Streaming transfers bypass [`Response`] and write their own header

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::status::StatusLine;
use crate::resilience::with_timeout;

pub const HTML: &str = "text/html; charset=utf-8";
pub const ICON: &str = "image/x-icon";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Status line plus the generic header block.
pub fn header_block(status: StatusLine, content_type: &str, length: u64) -> String {
    format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\n\r\n",
        status.as_str(),
        content_type,
        length
    )
}

/// Header for a file download of `length` bytes saved as `file_name`.
pub fn download_header(length: u64, file_name: &str) -> String {
    format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\nContent-Disposition: attachment; filename=\"{}\"\r\n\r\n",
        StatusLine::Ok.as_str(),
        OCTET_STREAM,
        length,
        file_name
    )
}

/// `write_all` bounded by `idle`.
pub async fn write_timed<S>(
    stream: &mut S,
    bytes: &[u8],
    idle: Option<Duration>,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    with_timeout(idle, stream.write_all(bytes)).await?
}

/// A complete response held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusLine,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    /// An HTML page.
    pub fn html(status: StatusLine, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: HTML,
            body: body.into().into_bytes(),
        }
    }

    /// A binary body, e.g. an icon.
    pub fn binary(status: StatusLine, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn status(&self) -> StatusLine {
        self.status
    }

    /// Header and body concatenated.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = header_block(self.status, self.content_type, self.body.len() as u64);
        let mut bytes = Vec::with_capacity(header.len() + self.body.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Send header and body in one write.
    pub async fn send<S>(&self, stream: &mut S, idle: Option<Duration>) -> std::io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        write_timed(stream, &self.to_bytes(), idle).await?;
        with_timeout(idle, stream.flush()).await?
    }
}
