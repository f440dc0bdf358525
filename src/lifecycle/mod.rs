//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber wakes, including late ones
//!
//! Tasks (tasks.rs):
//!     spawn_advisory → JoinSet → shutdown(grace) → abort stragglers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → foreground command stops its engine and exits
//! ```

pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use shutdown::Shutdown;
pub use tasks::TaskGroup;
