//! Minimal multipart/form-data support for single-file uploads.
//!
//! # Responsibilities
//! - Extract the boundary token from the request `Content-Type`
//! - Read the file part's header fields (filename, type, resume range)
//! - Find where the file payload ends by scanning for the next boundary
//!
//! # Design Decisions
//! - The payload ends at the first `\r\n--<boundary>` after the part header;
//!   whatever follows (other form fields, the closing marker) is epilogue
//! - The scanner holds back only enough bytes to recognise a marker split
//!   across reads, so memory stays bounded by one chunk plus the marker

use crate::http::reader::find_subslice;
use crate::http::request::find_header;

/// Boundary token from `multipart/form-data; boundary=...`.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let essence = params.next()?.trim();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
}

/// Header fields of one multipart part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeader {
    /// Form field name from `Content-Disposition`.
    pub name: Option<String>,
    /// Client file name from `Content-Disposition`, quotes stripped.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content_range: Option<String>,
}

impl PartHeader {
    /// Parse the text between the opening boundary line and the blank line.
    pub fn parse(block: &str) -> Self {
        let mut header = PartHeader {
            content_type: find_header(block, "Content-Type").map(str::to_string),
            content_range: find_header(block, "Content-Range").map(str::to_string),
            ..PartHeader::default()
        };

        if let Some(disposition) = find_header(block, "Content-Disposition") {
            for param in disposition.split(';').skip(1) {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                let value = value.trim().trim_matches('"').to_string();
                match key.trim() {
                    "name" => header.name = Some(value),
                    "filename" => header.filename = Some(value),
                    _ => {}
                }
            }
        }
        header
    }
}

/// Splits a part body from everything after it.
#[derive(Debug)]
pub struct BoundaryScanner {
    marker: Vec<u8>,
    carry: Vec<u8>,
    found: bool,
}

impl BoundaryScanner {
    pub fn new(boundary: &str) -> Self {
        let mut marker = Vec::with_capacity(boundary.len() + 4);
        marker.extend_from_slice(b"\r\n--");
        marker.extend_from_slice(boundary.as_bytes());
        Self {
            marker,
            carry: Vec::new(),
            found: false,
        }
    }

    /// Feed received bytes; payload that is certainly not part of a marker is
    /// appended to `payload`. Input after the marker is ignored.
    pub fn push(&mut self, data: &[u8], payload: &mut Vec<u8>) {
        if self.found {
            return;
        }
        self.carry.extend_from_slice(data);

        if let Some(pos) = find_subslice(&self.carry, &self.marker) {
            payload.extend_from_slice(&self.carry[..pos]);
            self.carry.clear();
            self.found = true;
            return;
        }

        let keep = (self.marker.len() - 1).min(self.carry.len());
        let emit = self.carry.len() - keep;
        payload.extend_from_slice(&self.carry[..emit]);
        self.carry.drain(..emit);
    }

    /// Whether the terminating boundary has been seen.
    pub fn is_complete(&self) -> bool {
        self.found
    }

    /// Bytes held back while waiting to rule out a split marker.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
