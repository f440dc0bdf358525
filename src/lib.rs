//! Privacy-routing sidecar library.
//!
//! Supervises a local engine process, talks to it over an authenticated
//! private channel, and keeps long-lived credentials encrypted at rest.

pub mod config;
pub mod credentials;
pub mod lifecycle;
pub mod mock_engine;
pub mod observability;
pub mod rpc;
pub mod secrets;
pub mod supervisor;

pub use config::SidecarConfig;
pub use credentials::{BearerToken, Passphrase};
pub use lifecycle::{Shutdown, TaskGroup};
pub use rpc::{Endpoint, RpcClient, RpcError};
pub use secrets::{SecretError, SecretStore};
pub use supervisor::{ProcessSupervisor, SupervisorConfig, SupervisorError, SupervisorState};
