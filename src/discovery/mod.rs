//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceName
//!     → resolver.rs (get-or-create DiscoveryContext)
//!     → registry.rs / service_center.rs (instances for RegistryQuery)
//!     → endpoint.rs (parse each raw endpoint, drop malformed)
//!     → CandidateSet (ordered, possibly empty)
//! ```
//!
//! # Design Decisions
//! - Candidate sets are recomputed on every lookup; freshness belongs to the registry
//! - Resolution never fails: errors surface only as a smaller or empty set

use std::sync::Arc;

use crate::config::{DiscoveryConfig, RegistryConfig};

pub mod endpoint;
pub mod registry;
pub mod resolver;
pub mod service_center;

pub use endpoint::{Endpoint, EndpointError, EndpointHost, EndpointScheme};
pub use registry::{Registry, RegistryError, RegistryQuery, ServiceInstance, StaticRegistry};
pub use resolver::{CandidateSet, DiscoveryContext, DiscoveryResolver, ServiceName};
pub use service_center::ServiceCenterRegistry;

/// Registry selected by configuration.
///
/// The static registry is also returned on its own so reloads can swap its table.
pub fn build_registry(
    config: &DiscoveryConfig,
    services: &[crate::config::StaticServiceConfig],
) -> Result<(Arc<dyn Registry>, Option<Arc<StaticRegistry>>), RegistryError> {
    match &config.registry {
        RegistryConfig::Static => {
            let registry = Arc::new(StaticRegistry::new(services));
            tracing::info!(services = registry.service_count(), "Using static registry");
            let shared: Arc<dyn Registry> = registry.clone();
            Ok((shared, Some(registry)))
        }
        RegistryConfig::ServiceCenter(sc) => {
            tracing::info!(address = %sc.address, project = %sc.project, "Using service-center registry");
            Ok((Arc::new(ServiceCenterRegistry::new(sc)?), None))
        }
    }
}
