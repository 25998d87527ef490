//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limit)
//!     → tls.rs (mandatory TLS handshake)
//!     → connection.rs (Connection owns the stream, tracker counts it)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept via semaphore; default limit of one serves clients in order
//! - Each connection tracked for graceful shutdown
//! - TLS is not optional: plain TCP clients fail the handshake and are dropped

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{Connection, ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use tls::{build_acceptor, CipherProfile, TlsError};
