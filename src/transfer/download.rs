//! Chunked file download.
//!
//! The header announces the exact file size. The body follows in fixed-size
//! chunks, each written with one `write_all`, the last one carrying the remainder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{download_header, write_timed};
use crate::observability::metrics;
use crate::resilience::with_timeout;

/// One file to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub source_path: PathBuf,
    pub total_size: u64,
    pub chunk_size: usize,
}

/// What a download did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Header and `bytes` body bytes were written.
    Sent { bytes: u64 },
    /// No regular file at the path; nothing was written.
    NotFound,
    /// Zero-length file; nothing was written.
    Empty,
}

impl DownloadJob {
    /// Stat `path`. Directories count as missing.
    pub async fn prepare(path: &Path, chunk_size: usize) -> std::io::Result<Option<Self>> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        if !meta.is_file() {
            return Ok(None);
        }
        Ok(Some(Self {
            source_path: path.to_path_buf(),
            total_size: meta.len(),
            chunk_size: chunk_size.max(1),
        }))
    }

    /// Name offered to the client.
    pub fn file_name(&self) -> &str {
        self.source_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("download")
    }

    /// Write the header, then the file in chunks.
    pub async fn send<S>(&self, stream: &mut S, idle: Option<Duration>) -> std::io::Result<u64>
    where
        S: AsyncWrite + Unpin,
    {
        let file = File::open(&self.source_path).await?;
        let mut reader = file.take(self.total_size);

        let header = download_header(self.total_size, self.file_name());
        write_timed(stream, header.as_bytes(), idle).await?;

        let mut chunk = vec![0u8; self.chunk_size];
        let mut sent = 0u64;
        while sent < self.total_size {
            let want = (self.total_size - sent).min(self.chunk_size as u64) as usize;
            // Fill the whole chunk so every write but the last is chunk_size bytes.
            let mut filled = 0;
            while filled < want {
                let n = reader.read(&mut chunk[filled..want]).await?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!(
                            "{} shrank to {} bytes during download",
                            self.source_path.display(),
                            sent + filled as u64
                        ),
                    ));
                }
                filled += n;
            }
            write_timed(stream, &chunk[..want], idle).await?;
            sent += want as u64;
        }

        with_timeout(idle, stream.flush()).await??;
        Ok(sent)
    }
}

/// Download `path` to `stream`.
pub async fn download<S>(
    stream: &mut S,
    path: &Path,
    chunk_size: usize,
    idle: Option<Duration>,
) -> std::io::Result<DownloadOutcome>
where
    S: AsyncWrite + Unpin,
{
    let Some(job) = DownloadJob::prepare(path, chunk_size).await? else {
        return Ok(DownloadOutcome::NotFound);
    };
    if job.total_size == 0 {
        tracing::info!(path = %path.display(), "Download skipped: file is empty");
        return Ok(DownloadOutcome::Empty);
    }

    tracing::debug!(
        path = %path.display(),
        total_size = job.total_size,
        chunk_size = job.chunk_size,
        "Download started"
    );
    let bytes = job.send(stream, idle).await?;
    metrics::record_transfer("download", bytes);
    Ok(DownloadOutcome::Sent { bytes })
}
