//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! CandidateSet resolved for a service
//!     → LoadBalancer::select (round_robin.rs)
//!     → Some(&Endpoint) or None (no instance available)
//! ```
//!
//! # Design Decisions
//! - Selection only indexes into the slice it is given; it never caches endpoints
//! - Counter scope is explicit: one per service, or one shared by all services
//! - Balancers are owned by the discovery context, not ambient globals

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::discovery::Endpoint;

pub mod round_robin;

pub use round_robin::RoundRobin;

/// Picks one endpoint out of a candidate slice.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Returns `None` when `candidates` is empty.
    fn select<'a>(&self, candidates: &'a [Endpoint]) -> Option<&'a Endpoint>;
}

/// Which services share a round-robin counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerScope {
    /// Every service rotates through its own candidates independently.
    #[default]
    PerService,
    /// One counter for the whole process.
    Shared,
}

/// Hands out balancers according to the configured scope.
#[derive(Debug)]
pub struct BalancerFactory {
    scope: BalancerScope,
    shared: Arc<RoundRobin>,
}

impl BalancerFactory {
    pub fn new(scope: BalancerScope) -> Self {
        Self {
            scope,
            shared: Arc::new(RoundRobin::new()),
        }
    }

    pub fn scope(&self) -> BalancerScope {
        self.scope
    }

    /// Balancer for a newly created service context.
    pub fn create(&self) -> Arc<dyn LoadBalancer> {
        match self.scope {
            BalancerScope::PerService => Arc::new(RoundRobin::new()),
            BalancerScope::Shared => self.shared.clone(),
        }
    }
}
