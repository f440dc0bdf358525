//! Local RPC to the engine process.
//!
//! # Data Flow
//! ```text
//! caller (CLI, supervisor readiness probe)
//!     → client.rs (typed call, bearer token, deadline)
//!     → transport.rs (Unix socket or TCP dial, HTTP/1.1 exchange)
//!     → types.rs (schema decode or ProtocolMismatch)
//! ```
//!
//! # Design Decisions
//! - Same client regardless of socket or port addressing
//! - Errors keep the failing stage: unreachable, rejected, or malformed
//! - No retries; write calls are not idempotent

pub mod client;
pub mod endpoint;
pub mod error;
pub(crate) mod transport;
pub mod types;

pub use client::{Resource, RpcClient, DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_REQUEST_TIMEOUT};
pub use endpoint::Endpoint;
pub use error::{RpcError, RpcResult, TransportPhase};
pub use types::{
    EngineStatus, HistoryEntry, MarketSnapshot, PayReceipt, PayRequest, ShieldReceipt,
    ShieldRequest, SwapReceipt, SwapRequest, DEFAULT_STRATEGY,
};
