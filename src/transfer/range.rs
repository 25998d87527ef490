//! `Content-Range` parsing for resumed uploads.
//!
//! Only the `bytes <start>-<end>/<total>` form is understood; `total` may be `*`.

use thiserror::Error;

/// Error type for Content-Range parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("unsupported range unit in {0:?}")]
    Unit(String),

    #[error("malformed byte range {0:?}")]
    Malformed(String),

    #[error("range end before start in {0:?}")]
    Inverted(String),
}

/// A parsed `Content-Range` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte position, inclusive.
    pub start: u64,
    /// Last byte position, inclusive.
    pub end: u64,
    /// Complete length, if the client knows it.
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Result<Self, RangeError> {
        let value = value.trim();
        let spec = value
            .strip_prefix("bytes ")
            .ok_or_else(|| RangeError::Unit(value.to_string()))?;
        let malformed = || RangeError::Malformed(value.to_string());

        let (range, total) = spec.split_once('/').ok_or_else(malformed)?;
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        let start: u64 = start.trim().parse().map_err(|_| malformed())?;
        let end: u64 = end.trim().parse().map_err(|_| malformed())?;
        let total = match total.trim() {
            "*" => None,
            digits => Some(digits.parse::<u64>().map_err(|_| malformed())?),
        };

        if end < start {
            return Err(RangeError::Inverted(value.to_string()));
        }
        if total.is_some_and(|total| end >= total) {
            return Err(malformed());
        }
        Ok(Self { start, end, total })
    }

    /// Bytes covered by the range.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }
}
