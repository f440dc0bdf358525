//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rpc::endpoint::DEFAULT_PORT;
use crate::rpc::{Endpoint, DEFAULT_REQUEST_TIMEOUT};
use crate::secrets::store::{DEFAULT_SECRET_SUFFIX, DEFAULT_SOCKET_NAME};
use crate::secrets::SecretStore;
use crate::supervisor::{DEFAULT_BINARY_NAME, DEFAULT_POLL_INTERVAL, DEFAULT_READINESS_DEADLINE};

/// Root configuration for the sidecar.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarConfig {
    /// Secret store location and file naming.
    pub storage: StorageConfig,

    /// Engine executable and addressing.
    pub engine: EngineConfig,

    /// Readiness gate timing.
    pub readiness: ReadinessConfig,

    /// RPC client settings.
    pub rpc: RpcConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl SidecarConfig {
    /// Endpoint for the engine of this installation.
    ///
    /// Unix transport uses the store's well-known socket path.
    pub fn endpoint(&self, store: &SecretStore) -> Endpoint {
        match self.engine.transport {
            Transport::Unix => store.endpoint(),
            Transport::Tcp => Endpoint::tcp(self.engine.host.clone(), self.engine.port),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store directory. Defaults to `~/.shadowprism`.
    pub dir: Option<PathBuf>,

    /// Engine socket file name inside the store directory.
    pub socket_name: String,

    /// Suffix of encrypted secret files.
    pub secret_suffix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            socket_name: DEFAULT_SOCKET_NAME.to_string(),
            secret_suffix: DEFAULT_SECRET_SUFFIX.to_string(),
        }
    }
}

/// How the engine is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Unix,
    Tcp,
}

/// Engine launch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transport: Transport,

    /// Listen host in TCP mode.
    pub host: String,

    /// Listen port in TCP mode.
    pub port: u16,

    /// Explicit engine executable. Skips the search.
    pub binary_path: Option<PathBuf>,

    /// Ordered candidate executables. Empty means the built-in list.
    pub search_paths: Vec<PathBuf>,

    /// Executable name used by the built-in search list.
    pub binary_name: String,

    /// Refuse to start the engine without a keystore passphrase.
    pub require_passphrase: bool,

    /// Additional environment for the engine process.
    pub extra_env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Unix,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            binary_path: None,
            search_paths: Vec::new(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            require_passphrase: true,
            extra_env: BTreeMap::new(),
        }
    }
}

/// Readiness gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Upper bound for one start attempt (milliseconds).
    pub deadline_ms: u64,

    /// Interval between health probes (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_READINESS_DEADLINE.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// RPC client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-call timeout (milliseconds).
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: SidecarConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.transport, Transport::Unix);
        assert_eq!(config.engine.port, 42069);
        assert_eq!(config.engine.binary_name, "shadowprism-core");
        assert!(config.engine.require_passphrase);
        assert_eq!(config.readiness.deadline_ms, 10_000);
        assert_eq!(config.readiness.poll_interval_ms, 500);
        assert_eq!(config.rpc.request_timeout_ms, 5_000);
        assert_eq!(config.storage.socket_name, "engine.sock");
        assert_eq!(config.storage.secret_suffix, ".enc");
    }

    #[test]
    fn test_partial_sections() {
        let config: SidecarConfig = toml::from_str(
            r#"
            [engine]
            transport = "tcp"
            port = 4000

            [engine.extra_env]
            RUST_LOG = "debug"

            [readiness]
            poll_interval_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.transport, Transport::Tcp);
        assert_eq!(config.engine.port, 4000);
        assert_eq!(config.engine.host, "127.0.0.1");
        assert_eq!(config.engine.extra_env["RUST_LOG"], "debug");
        assert_eq!(config.readiness.poll_interval_ms, 100);
        assert_eq!(config.readiness.deadline_ms, 10_000);
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let result = toml::from_str::<SidecarConfig>("[engine]\ntransport = \"pipe\"\n");
        assert!(result.is_err());
    }
}
