//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace)
//!     → [routing layer extracts service and forward path]
//!     → [discovery resolves candidates, load balancer picks one]
//!     → request.rs (outbound header policy)
//!     → forward.rs (stream request to backend, await response head)
//!     → response.rs (filter headers, stream body back)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ExchangeContext, ForwardError, Forwarder};
pub use request::{MakeDispatchRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
