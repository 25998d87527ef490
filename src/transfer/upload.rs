//! Resumable multipart upload engine.
//!
//! # Data Flow
//! ```text
//! POST /upload (headers parsed, some body bytes already buffered)
//!     → read until the file part's header is complete
//!     → PartHeader: filename, declared type, optional Content-Range
//!     → ContentTypeRegistry check (extension must name the declared type)
//!     → open destination: create/truncate, or append after a size check
//!     → stream chunks through BoundaryScanner into the file
//!     → drain the epilogue, report
//! ```
//!
//! # Design Decisions
//! - Nothing touches the disk before the type check and the resume-offset check pass
//! - Payload length comes from boundary scanning, not from Content-Length arithmetic
//! - Reads never go past the declared Content-Length
//! - Every failure is a typed [`UploadError`]; the caller must turn it into a response
//!   or a dropped connection

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::config::LimitsConfig;
use crate::http::reader::{read_some, read_until_delimiter, ReadError, HEADER_DELIMITER};
use crate::http::request::Request;
use crate::observability::metrics;
use crate::storage::{base_name, Storage, StorageError};
use crate::transfer::content_type::ContentTypeRegistry;
use crate::transfer::multipart::{boundary_from_content_type, BoundaryScanner, PartHeader};
use crate::transfer::range::{ContentRange, RangeError};

/// Error type for uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing or invalid Content-Length")]
    ContentLength,

    #[error("Request is not multipart/form-data with a boundary")]
    MissingBoundary,

    #[error("File part has no filename")]
    MissingFilename,

    #[error("File part has no Content-Type")]
    MissingContentType,

    #[error("Filetype is not allowed: {0}")]
    UnsupportedType(String),

    #[error("Filetype is not the same: {filename} was declared as {declared}")]
    TypeMismatch { filename: String, declared: String },

    #[error("Malformed Content-Range: {0}")]
    MalformedRange(#[from] RangeError),

    #[error("Mismatched start byte: resume at {requested}, stored {stored} bytes")]
    RangeMismatch { requested: u64, stored: u64 },

    #[error("Invalid file name: {0}")]
    Destination(#[from] StorageError),

    #[error("Upload body ended without a closing boundary after {written} bytes")]
    Unterminated { written: u64 },

    #[error("File part header: {0}")]
    PartHeader(ReadError),

    #[error("Connection ended after {written} payload bytes")]
    Interrupted { written: u64 },

    #[error("Socket read failed: {0}")]
    Read(ReadError),

    #[error("Writing the file failed: {0}")]
    File(std::io::Error),
}

impl UploadError {
    /// Whether the socket is unusable, so no response can be sent.
    pub fn is_transport(&self) -> bool {
        match self {
            UploadError::Interrupted { .. } | UploadError::Read(_) => true,
            UploadError::PartHeader(err) => !matches!(err, ReadError::TooLarge { .. }),
            _ => false,
        }
    }
}

/// Everything known about one upload before the first byte is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub filename: String,
    pub declared_mime_type: String,
    pub boundary_token: String,
    /// Declared body length of the whole request.
    pub total_declared_length: u64,
    pub resume_offset: u64,
    pub destination_path: PathBuf,
    pub append: bool,
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub filename: String,
    /// Payload bytes written by this request.
    pub written: u64,
    pub resumed_from: u64,
    /// File size after the write.
    pub file_size: u64,
}

/// Receives a multipart upload from a connection into user storage.
#[derive(Debug, Clone)]
pub struct UploadEngine<'a> {
    storage: &'a Storage,
    registry: ContentTypeRegistry,
    chunk_size: usize,
    max_part_header_bytes: usize,
    max_drain_bytes: usize,
    idle: Option<Duration>,
}

impl<'a> UploadEngine<'a> {
    pub fn new(storage: &'a Storage, limits: &LimitsConfig, idle: Option<Duration>) -> Self {
        Self {
            storage,
            registry: ContentTypeRegistry::standard(),
            chunk_size: limits.chunk_size.max(1),
            max_part_header_bytes: limits.max_part_header_bytes,
            max_drain_bytes: limits.max_drain_bytes,
            idle,
        }
    }

    /// Receive the upload whose request head is `request`.
    ///
    /// `request.body` holds the body bytes that arrived with the header block.
    pub async fn receive<S>(
        &self,
        stream: &mut S,
        request: Request,
    ) -> Result<UploadReport, UploadError>
    where
        S: AsyncRead + Unpin,
    {
        let total = request.content_length().ok_or(UploadError::ContentLength)?;
        let boundary = request
            .header("Content-Type")
            .and_then(boundary_from_content_type)
            .ok_or(UploadError::MissingBoundary)?;

        let body_len = usize::try_from(total).unwrap_or(usize::MAX);
        let mut buf = request.body;
        buf.truncate(body_len);
        let header_limit = self.max_part_header_bytes.min(body_len);
        let part_end = read_until_delimiter(stream, &mut buf, 0, header_limit, self.idle)
            .await
            .map_err(UploadError::PartHeader)?;
        let unread = total.saturating_sub(buf.len() as u64);

        let part_head = String::from_utf8_lossy(&buf[..part_end]);
        let session = match self.plan(&part_head, boundary, total) {
            Ok(session) => session,
            Err(err) => {
                self.discard(stream, unread).await;
                return Err(err);
            }
        };

        tracing::debug!(
            filename = %session.filename,
            declared_type = %session.declared_mime_type,
            content_length = session.total_declared_length,
            resume_offset = session.resume_offset,
            "Upload accepted"
        );

        let mut file = match session.open().await {
            Ok(file) => file,
            Err(err) => {
                self.discard(stream, unread).await;
                return Err(err);
            }
        };

        let initial = &buf[part_end + HEADER_DELIMITER.len()..];
        let streamed = self.stream_payload(stream, &mut file, &session, initial, unread).await;
        // Flush whatever made it to the file, on success and failure alike.
        let flushed = file.flush().await.map_err(UploadError::File);
        drop(file);

        let (written, remaining) = streamed?;
        flushed?;

        self.discard(stream, remaining).await;
        metrics::record_transfer("upload", written);

        Ok(UploadReport {
            filename: session.filename,
            written,
            resumed_from: session.resume_offset,
            file_size: session.resume_offset + written,
        })
    }

    /// Validate the file part header and decide where the bytes go.
    fn plan(
        &self,
        part_head: &str,
        boundary: String,
        total: u64,
    ) -> Result<UploadSession, UploadError> {
        let part = PartHeader::parse(part_head);
        let filename = part
            .filename
            .as_deref()
            .map(base_name)
            .filter(|name| !name.is_empty())
            .ok_or(UploadError::MissingFilename)?
            .to_string();
        let declared = part.content_type.ok_or(UploadError::MissingContentType)?;

        let entry = self
            .registry
            .by_mime(&declared)
            .ok_or_else(|| UploadError::UnsupportedType(declared.clone()))?;
        if !entry.matches_file_name(&filename) {
            return Err(UploadError::TypeMismatch { filename, declared });
        }

        let range = part
            .content_range
            .as_deref()
            .map(ContentRange::parse)
            .transpose()?;
        if let Some(range) = &range {
            tracing::debug!(
                start = range.start,
                byte_count = range.byte_count(),
                total = ?range.total,
                "Upload carries a byte range"
            );
        }
        let resume_offset = range.map_or(0, |range| range.start);
        let destination_path = self.storage.user_path(&filename)?;

        Ok(UploadSession {
            filename,
            declared_mime_type: declared,
            boundary_token: boundary,
            total_declared_length: total,
            resume_offset,
            destination_path,
            append: resume_offset > 0,
        })
    }

    /// Copy the part payload into `file`. Returns bytes written and body bytes
    /// still unread on the socket.
    async fn stream_payload<S>(
        &self,
        stream: &mut S,
        file: &mut File,
        session: &UploadSession,
        initial: &[u8],
        mut unread: u64,
    ) -> Result<(u64, u64), UploadError>
    where
        S: AsyncRead + Unpin,
    {
        let mut scanner = BoundaryScanner::new(&session.boundary_token);
        let mut payload = Vec::with_capacity(self.chunk_size + initial.len());
        let mut written = 0u64;

        scanner.push(initial, &mut payload);
        written += write_payload(file, &mut payload).await?;

        let mut chunk = vec![0u8; self.chunk_size];
        while !scanner.is_complete() && unread > 0 {
            let want = unread.min(self.chunk_size as u64) as usize;
            let n = match read_some(stream, &mut chunk[..want], self.idle).await {
                Ok(n) => n,
                Err(err) => {
                    tracing::warn!(
                        filename = %session.filename,
                        written,
                        error = %err,
                        "Upload read failed; partial file kept for resume"
                    );
                    return Err(UploadError::Read(err));
                }
            };
            if n == 0 {
                tracing::warn!(
                    filename = %session.filename,
                    written,
                    held_back = scanner.pending(),
                    "Peer closed mid-upload; partial file kept for resume"
                );
                return Err(UploadError::Interrupted { written });
            }
            unread -= n as u64;

            scanner.push(&chunk[..n], &mut payload);
            written += write_payload(file, &mut payload).await?;
        }

        if !scanner.is_complete() {
            return Err(UploadError::Unterminated { written });
        }
        Ok((written, unread))
    }

    /// Read and drop up to `remaining` body bytes so the client can read our answer.
    async fn discard<S>(&self, stream: &mut S, remaining: u64)
    where
        S: AsyncRead + Unpin,
    {
        let mut left = remaining.min(self.max_drain_bytes as u64);
        if left < remaining {
            tracing::debug!(remaining, "Leaving oversized request body unread");
        }
        let mut sink = vec![0u8; self.chunk_size];
        while left > 0 {
            let want = left.min(sink.len() as u64) as usize;
            match read_some(stream, &mut sink[..want], self.idle).await {
                Ok(0) | Err(_) => break,
                Ok(n) => left -= n as u64,
            }
        }
    }
}

impl UploadSession {
    /// Open the destination for writing.
    ///
    /// A resumed upload only appends when the stored size equals the resume offset.
    async fn open(&self) -> Result<File, UploadError> {
        if !self.append {
            return File::create(&self.destination_path)
                .await
                .map_err(UploadError::File);
        }

        let file = match OpenOptions::new().append(true).open(&self.destination_path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::RangeMismatch {
                    requested: self.resume_offset,
                    stored: 0,
                });
            }
            Err(err) => return Err(UploadError::File(err)),
        };

        let stored = file.metadata().await.map_err(UploadError::File)?.len();
        if stored != self.resume_offset {
            return Err(UploadError::RangeMismatch {
                requested: self.resume_offset,
                stored,
            });
        }
        Ok(file)
    }
}

async fn write_payload(file: &mut File, payload: &mut Vec<u8>) -> Result<u64, UploadError> {
    if payload.is_empty() {
        return Ok(0);
    }
    file.write_all(payload).await.map_err(UploadError::File)?;
    let n = payload.len() as u64;
    payload.clear();
    Ok(n)
}
