//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (prefix strip, service segment split)
//!     → Return: DispatchTarget { service, forward_path } or NoMatch
//! ```
//!
//! # Design Decisions
//! - Prefix fixed at startup, immutable at runtime
//! - No regex in hot path
//! - Explicit NoMatch rather than silent default

pub mod router;

pub use router::{DispatchTarget, PathRouter};
