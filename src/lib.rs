//! HTTPS file server library.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod storage;
pub mod transfer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
