//! Engine process supervision.
//!
//! # Data Flow
//! ```text
//! start(deadline, token, passphrase?)
//!     → binary.rs (explicit path, search list, or embedded copy)
//!     → process.rs (spawn with env contract, forward output)
//!     → readiness.rs (probe GET /health every poll interval)
//!     → Ready, or Failed with the child already killed
//! ```
//!
//! # Design Decisions
//! - Credentials reach the child through its environment, never argv
//! - The supervisor is the only owner of the child handle
//! - Child is spawned with kill_on_drop so nothing outlives its owner
//! - Forceful kill on stop; the engine is restart-safe

pub mod binary;
pub mod error;
pub mod process;
pub mod readiness;
pub mod state;

pub use binary::{EngineBinary, DEFAULT_BINARY_NAME};
pub use error::{SupervisorError, SupervisorResult};
pub use process::{
    ProcessSupervisor, SupervisorConfig, DEFAULT_POLL_INTERVAL, DEFAULT_READINESS_DEADLINE,
};
pub use readiness::Readiness;
pub use state::SupervisorState;
