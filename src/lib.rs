//! HTTP edge-gateway dispatcher library.
//!
//! Requests to `/ui/{service}/{rest}` are resolved through a service registry,
//! balanced round-robin across the service's endpoints and streamed to the
//! chosen backend as `/{rest}`.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::DispatcherConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
