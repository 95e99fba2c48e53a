//! Service name → candidate endpoints.
//!
//! # Responsibilities
//! - Keep exactly one [`DiscoveryContext`] per service for the process lifetime
//! - Query the registry on every lookup and flatten instance endpoints
//! - Drop malformed endpoints individually, never failing the whole lookup
//!
//! # Design Decisions
//! - Contexts cache query setup and the service's balancer, never results
//! - Registry errors are absorbed: the caller only ever sees a (possibly empty) set
//! - Context creation uses the `DashMap` entry API so racing lookups create one context

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::DiscoveryConfig;
use crate::discovery::endpoint::Endpoint;
use crate::discovery::registry::{Registry, RegistryQuery};
use crate::load_balancer::{BalancerFactory, LoadBalancer};
use crate::observability::metrics;

/// Non-empty identifier of a backend service family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    /// Returns `None` for an empty name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered endpoints resolved for one service by one lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    endpoints: Vec<Endpoint>,
}

impl CandidateSet {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn as_slice(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

/// Cached per-service lookup setup.
#[derive(Debug)]
pub struct DiscoveryContext {
    query: RegistryQuery,
    balancer: Arc<dyn LoadBalancer>,
    lookups: AtomicU64,
}

impl DiscoveryContext {
    pub fn query(&self) -> &RegistryQuery {
        &self.query
    }

    pub fn balancer(&self) -> Arc<dyn LoadBalancer> {
        self.balancer.clone()
    }

    /// Number of lookups served through this context.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

/// Resolves service names to candidate endpoints through a [`Registry`].
#[derive(Debug)]
pub struct DiscoveryResolver {
    registry: Arc<dyn Registry>,
    app_id: String,
    version_rule: String,
    balancers: BalancerFactory,
    contexts: DashMap<ServiceName, Arc<DiscoveryContext>>,
}

impl DiscoveryResolver {
    pub fn new(registry: Arc<dyn Registry>, config: &DiscoveryConfig, balancers: BalancerFactory) -> Self {
        Self {
            registry,
            app_id: config.app_id.clone(),
            version_rule: config.version_rule.clone(),
            balancers,
            contexts: DashMap::new(),
        }
    }

    /// Get or lazily create the context for `service`.
    pub fn context(&self, service: &ServiceName) -> Arc<DiscoveryContext> {
        if let Some(existing) = self.contexts.get(service) {
            return existing.clone();
        }

        self.contexts
            .entry(service.clone())
            .or_insert_with(|| {
                tracing::debug!(service = %service, scope = ?self.balancers.scope(), "Creating discovery context");
                Arc::new(DiscoveryContext {
                    query: RegistryQuery {
                        app_id: self.app_id.clone(),
                        service_name: service.as_str().to_string(),
                        version_rule: self.version_rule.clone(),
                    },
                    balancer: self.balancers.create(),
                    lookups: AtomicU64::new(0),
                })
            })
            .clone()
    }

    /// Balancer owned by the context of `service`.
    pub fn balancer(&self, service: &ServiceName) -> Arc<dyn LoadBalancer> {
        self.context(service).balancer()
    }

    /// Number of contexts created so far.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Resolve `service` to its current candidate endpoints.
    pub async fn resolve(&self, service: &ServiceName) -> CandidateSet {
        let context = self.context(service);
        context.lookups.fetch_add(1, Ordering::Relaxed);

        let instances = match self.registry.find_instances(context.query()).await {
            Ok(instances) => instances,
            Err(e) => {
                tracing::error!(service = %service, error = %e, "Registry lookup failed");
                metrics::record_registry_error();
                return CandidateSet::default();
            }
        };

        let mut endpoints = Vec::new();
        for instance in &instances {
            for raw in &instance.endpoints {
                match Endpoint::parse(raw) {
                    Ok(endpoint) => endpoints.push(endpoint),
                    Err(e) => {
                        tracing::warn!(
                            service = %service,
                            instance_id = %instance.instance_id,
                            endpoint = %raw,
                            error = %e,
                            "Dropping malformed endpoint"
                        );
                        metrics::record_malformed_endpoint(service.as_str());
                    }
                }
            }
        }

        let candidates = CandidateSet::new(endpoints);
        tracing::debug!(
            service = %service,
            instances = instances.len(),
            candidates = candidates.len(),
            "Service resolved"
        );

        candidates
    }
}
