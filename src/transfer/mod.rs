//! File transfer subsystem.
//!
//! # Data Flow
//! ```text
//! POST /upload
//!     → multipart.rs (boundary, part header, payload end)
//!     → content_type.rs (declared type vs. file extension)
//!     → range.rs (resume offset from Content-Range)
//!     → upload.rs (validate, open, stream to disk)
//!
//! POST /download
//!     → download.rs (size header, fixed-size chunks)
//! ```

pub mod content_type;
pub mod download;
pub mod multipart;
pub mod range;
pub mod upload;

pub use content_type::{ContentType, ContentTypeRegistry};
pub use download::{download, DownloadJob, DownloadOutcome};
pub use range::{ContentRange, RangeError};
pub use upload::{UploadEngine, UploadError, UploadReport, UploadSession};
