//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed Request (method, path)
//!     → method gate (GET/POST only; handled by the dispatcher)
//!     → router.rs (exact lookup)
//!     → Return: Route, or Route::NotFound
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - Deterministic: same input always matches same route

pub mod router;

pub use router::{Route, RouteEntry, RouteTable};
