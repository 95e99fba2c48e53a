//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::discovery::Endpoint;
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores an internal counter to rotate through candidates.
///
/// The counter is taken modulo the length of the slice passed to each call,
/// so rotation is only exact while the candidate count stays the same.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector whose first pick is `start mod len`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn select<'a>(&self, candidates: &'a [Endpoint]) -> Option<&'a Endpoint> {
        if candidates.is_empty() {
            return None;
        }

        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let index = (count % candidates.len() as u64) as usize;
        candidates.get(index)
    }
}
