//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Check the static service table for empty or duplicate names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatcherConfig → Result<(), Vec<ValidationError>>
//! - Malformed endpoint strings are not errors here; they are dropped at lookup time

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{DispatcherConfig, RegistryConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("dispatch.path_prefix must not be empty")]
    EmptyPathPrefix,

    #[error("discovery.app_id must not be empty")]
    EmptyAppId,

    #[error("service-center address `{0}` is not an http(s) url")]
    InvalidRegistryAddress(String),

    #[error("services[{index}]: name must not be empty")]
    EmptyServiceName { index: usize },

    #[error("services: duplicate service `{0}`")]
    DuplicateService(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DispatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.dispatch.path_prefix.trim_matches('/').is_empty() {
        errors.push(ValidationError::EmptyPathPrefix);
    }

    if config.discovery.app_id.is_empty() {
        errors.push(ValidationError::EmptyAppId);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.connect_secs" });
    }

    if let RegistryConfig::ServiceCenter(sc) = &config.discovery.registry {
        let valid = url::Url::parse(&sc.address)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidRegistryAddress(sc.address.clone()));
        }
        if sc.timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue { field: "discovery.registry.timeout_secs" });
        }
    }

    let mut seen = HashSet::new();
    for (index, service) in config.services.iter().enumerate() {
        if service.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName { index });
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
