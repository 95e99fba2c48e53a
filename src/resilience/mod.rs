//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (connect timeout on the connector, deadline on the response head)
//!     → On expiry: 504; on connect/transport failure: 502
//! ```
//!
//! # Design Decisions
//! - Every outbound exchange has a bounded connect and response-head phase
//! - No retries: a failed exchange is reported, never replayed on another endpoint

pub mod timeouts;

pub use timeouts::{within, ExchangeTimeouts};
