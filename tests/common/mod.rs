//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use tls_fileserver::config::ServerConfig;
use tls_fileserver::http::{serve_connection, AppContext, ConnectionError};
use tls_fileserver::net::{Connection, ConnectionId};

pub const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";
pub const PUBLIC_URL: &str = "https://files.test:8443";

/// A server context over a throwaway work directory.
pub struct TestSite {
    dir: TempDir,
    pub ctx: Arc<AppContext>,
}

impl TestSite {
    pub fn new() -> Self {
        Self::with_chunk_size(8192)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), chunk_size);
        let ctx = AppContext::new(config);
        std::fs::create_dir_all(ctx.storage().user_root()).unwrap();
        Self {
            dir,
            ctx: Arc::new(ctx),
        }
    }

    pub fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn user_file(&self, name: &str) -> PathBuf {
        self.ctx.storage().user_root().join(name)
    }

    /// Run one request through the pipeline over an in-memory pipe.
    pub async fn exchange(&self, request: Vec<u8>) -> (Vec<u8>, Result<(), ConnectionError>) {
        exchange(Arc::clone(&self.ctx), request).await
    }
}

pub fn test_config(work_dir: &Path, chunk_size: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.storage.work_dir = work_dir.to_path_buf();
    config.limits.chunk_size = chunk_size;
    config.site.public_url = Some(PUBLIC_URL.to_string());
    config.timeouts.header_secs = 5;
    config.timeouts.idle_secs = 5;
    config
}

/// Write `request` from a client task while the server side runs `serve_connection`.
///
/// Returns everything the server sent before closing, and the server's result.
pub async fn exchange(
    ctx: Arc<AppContext>,
    request: Vec<u8>,
) -> (Vec<u8>, Result<(), ConnectionError>) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

    let server_task = tokio::spawn(async move {
        let mut connection = Connection::new(ConnectionId::new(), peer, server);
        serve_connection(&mut connection, &ctx).await
    });

    let (mut read_half, mut write_half) = tokio::io::split(client);
    let writer = tokio::spawn(async move {
        // The server may answer and close before reading everything.
        let _ = write_half.write_all(&request).await;
        // Half-close so a server waiting for more body bytes sees EOF.
        let _ = write_half.shutdown().await;
    });

    let mut response = Vec::new();
    read_half.read_to_end(&mut response).await.unwrap();
    let result = server_task.await.unwrap();
    let _ = writer.await;
    (response, result)
}

/// Split a response into its header text and raw body.
pub fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("response has a header block");
    (
        String::from_utf8(response[..end].to_vec()).unwrap(),
        response[end + 4..].to_vec(),
    )
}

/// Multipart body with one file part and a trailing submit field.
pub fn multipart_body(filename: &str, mime: &str, range: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"Filename\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n"
    )
    .into_bytes();
    if let Some(range) = range {
        body.extend_from_slice(format!("Content-Range: {range}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"btnSubmit\"\r\n\r\nUpload\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );
    body
}

/// Complete `POST /upload` request.
pub fn upload_request(filename: &str, mime: &str, range: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let body = multipart_body(filename, mime, range, payload);
    let mut request = format!(
        "POST /upload HTTP/1.1\r\nHost: files.test\r\nContent-Type: multipart/form-data; boundary={BOUNDARY}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(&body);
    request
}

/// Complete url-encoded `POST` request.
pub fn form_request(path: &str, form: &str) -> Vec<u8> {
    format!(
        "POST {path} HTTP/1.1\r\nHost: files.test\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{form}",
        form.len()
    )
    .into_bytes()
}

pub fn get_request(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: files.test\r\n\r\n").into_bytes()
}

/// Deterministic, non-text payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}
