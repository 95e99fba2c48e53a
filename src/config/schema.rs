//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::load_balancer::BalancerScope;

/// Root configuration for the edge dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dispatch path convention.
    pub dispatch: DispatchConfig,

    /// Registry and lookup scoping.
    pub discovery: DiscoveryConfig,

    /// Load balancing settings.
    pub load_balancer: LoadBalancerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Header forwarding policy.
    pub headers: HeaderPolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Services served by the static registry.
    pub services: Vec<StaticServiceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Dispatch path configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// First path segment(s) of dispatched requests, `ui` → `/ui/{service}/{rest}`.
    pub path_prefix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            path_prefix: "ui".to_string(),
        }
    }
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Application (tenant) id lookups are scoped to.
    pub app_id: String,

    /// Version rule passed to the registry. `0.0.0.0+` selects all versions.
    pub version_rule: String,

    /// Registry backend.
    pub registry: RegistryConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            app_id: "default".to_string(),
            version_rule: "0.0.0.0+".to_string(),
            registry: RegistryConfig::default(),
        }
    }
}

/// Registry backend selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// Instances come from the `[[services]]` table.
    #[default]
    Static,
    /// Instances come from a remote service center.
    ServiceCenter(ServiceCenterConfig),
}

/// Remote service-center connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceCenterConfig {
    /// Base URL, e.g. "http://127.0.0.1:30100".
    pub address: String,

    /// Project (domain) segment of the API path.
    pub project: String,

    /// Per-query timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceCenterConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:30100".to_string(),
            project: "default".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Load balancer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Round-robin counter scope.
    pub scope: BalancerScope,
}

/// Timeout configuration for outbound exchanges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Seconds allowed between the end of the upload and the backend's response head. 0 disables.
    pub response_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Which headers are forwarded, rewritten or added.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Forward the inbound `Host` header instead of the endpoint authority.
    pub preserve_host: bool,

    /// Add `x-forwarded-for`, `x-forwarded-host` and `x-forwarded-proto`.
    pub forwarded: bool,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            preserve_host: false,
            forwarded: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A service known to the static registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StaticServiceConfig {
    /// Service name as used in `/ui/{service}/...`.
    pub name: String,

    /// Instances in lookup order.
    #[serde(default)]
    pub instances: Vec<StaticInstanceConfig>,
}

/// One instance of a static service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StaticInstanceConfig {
    /// Instance identifier.
    pub id: String,

    /// Raw endpoints, e.g. "rest://127.0.0.1:3000".
    pub endpoints: Vec<String>,
}
