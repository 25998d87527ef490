//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! TLS handshake / header read / chunk read / chunk write
//!     → timeouts.rs (bounded wait)
//!     → Ok(value) or TimedOut → connection aborted, listener keeps running
//! ```
//!
//! # Design Decisions
//! - Every suspension point on a socket can carry a deadline
//! - A disabled timeout (`None`) waits forever, matching a trusted LAN setup
//! - No automatic retries: the client resumes uploads with `Content-Range`

pub mod timeouts;

pub use timeouts::{with_timeout, TimedOut};
