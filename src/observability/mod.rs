//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Supervised engine:
//!     child stdout/stderr → tracing events (target "engine")
//! ```
//!
//! # Design Decisions
//! - Structured key/value fields, never secrets or tokens
//! - Request ID flows from client to engine logs via `x-request-id`

pub mod logging;
