//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → reader.rs (bytes until \r\n\r\n, bounded)
//!     → request.rs (request line, query, headers, form bodies)
//!     → handlers.rs (method gate, route table, handler)
//!     → response.rs / transfer engines (status line, headers, body)
//!     → server.rs closes the connection
//! ```

pub mod handlers;
pub mod pages;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{Method, Request};
pub use response::Response;
pub use server::{serve_connection, AppContext, ConnectionError, HttpServer};
pub use status::StatusLine;
