//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, --config / PRISM_CONFIG / ~/.shadowprism/config.toml)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SidecarConfig (validated, immutable)
//!     → SecretStore, SupervisorConfig, RpcClient
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, CONFIG_ENV_VAR};
pub use schema::{
    EngineConfig, ObservabilityConfig, ReadinessConfig, RpcConfig, SidecarConfig, StorageConfig,
    Transport,
};
pub use validation::{validate_config, ValidationError};
