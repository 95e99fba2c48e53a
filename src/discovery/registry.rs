//! Registry collaborator interface and the static, config-backed registry.
//!
//! # Responsibilities
//! - Define the query/answer shape the resolver consumes
//! - Provide an in-process registry fed from configuration
//!
//! # Design Decisions
//! - The registry owns versioning and freshness; callers never compare versions
//! - Instances are returned as an ordered list to keep registry iteration order
//! - The static table is swapped atomically on reload, readers never block

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::StaticServiceConfig;

/// Error reported by a registry backend.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Registry query setup for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryQuery {
    /// Application (tenant) identity the lookup is scoped to.
    pub app_id: String,
    pub service_name: String,
    /// Version rule understood by the registry, e.g. `0.0.0.0+` for all versions.
    pub version_rule: String,
}

/// One registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub instance_id: String,
    /// Raw endpoint strings, unparsed.
    pub endpoints: Vec<String>,
}

impl ServiceInstance {
    pub fn new(instance_id: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            endpoints,
        }
    }
}

/// Answers "which instances implement service S".
#[async_trait]
pub trait Registry: Send + Sync + fmt::Debug {
    /// Return all instances matching the query, in registry order.
    /// An unknown service is an empty list, not an error.
    async fn find_instances(&self, query: &RegistryQuery) -> Result<Vec<ServiceInstance>, RegistryError>;
}

type ServiceTable = HashMap<String, Vec<ServiceInstance>>;

/// Registry backed by the `[[services]]` configuration table.
///
/// Ignores the application id and version rule of the query.
#[derive(Debug)]
pub struct StaticRegistry {
    table: ArcSwap<ServiceTable>,
}

impl StaticRegistry {
    pub fn new(services: &[StaticServiceConfig]) -> Self {
        Self {
            table: ArcSwap::from_pointee(Self::build_table(services)),
        }
    }

    /// Atomically replace the whole service table.
    pub fn replace(&self, services: &[StaticServiceConfig]) {
        let table = Self::build_table(services);
        tracing::info!(services = table.len(), "Static registry table replaced");
        self.table.store(Arc::new(table));
    }

    /// Number of services currently known.
    pub fn service_count(&self) -> usize {
        self.table.load().len()
    }

    fn build_table(services: &[StaticServiceConfig]) -> ServiceTable {
        let mut table = ServiceTable::new();
        for service in services {
            let instances = table.entry(service.name.clone()).or_default();
            for instance in &service.instances {
                instances.push(ServiceInstance::new(instance.id.clone(), instance.endpoints.clone()));
            }
        }
        table
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn find_instances(&self, query: &RegistryQuery) -> Result<Vec<ServiceInstance>, RegistryError> {
        Ok(self
            .table
            .load()
            .get(&query.service_name)
            .cloned()
            .unwrap_or_default())
    }
}
