//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatcherConfig (validated, immutable)
//!     → handed to HttpServer at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → sent to the running server
//!     → static registry table swapped atomically
//! ```
//!
//! # Design Decisions
//! - Only the static service table is reloadable; other settings need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DiscoveryConfig, DispatchConfig, DispatcherConfig, HeaderPolicyConfig, ListenerConfig, LoadBalancerConfig,
    LogFormat, ObservabilityConfig, RegistryConfig, ServiceCenterConfig, StaticInstanceConfig, StaticServiceConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
