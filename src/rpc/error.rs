//! RPC client error definitions.

use thiserror::Error;

/// How far a request got before the transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    /// Dialing the endpoint failed; nothing was sent.
    Connect,
    /// The connection was open; the engine may have received the request.
    Exchange,
}

impl std::fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportPhase::Connect => f.write_str("connect"),
            TransportPhase::Exchange => f.write_str("exchange"),
        }
    }
}

/// Errors returned by [`RpcClient`](crate::rpc::RpcClient) calls.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The engine could not be reached or did not answer in time.
    #[error("engine unreachable at {endpoint} during {phase}: {reason}")]
    Unreachable {
        endpoint: String,
        phase: TransportPhase,
        reason: String,
    },

    /// The engine answered with an error status.
    #[error("engine rejected request (HTTP {status}): {message}")]
    EngineRejected { status: u16, message: String },

    /// The engine answered, but not with the expected structure.
    #[error("engine response for '{resource}' did not match the expected schema: {reason}")]
    ProtocolMismatch {
        resource: &'static str,
        reason: String,
    },

    /// The request could not be built locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RpcError {
    /// True when the request may have reached the engine without an answer.
    ///
    /// For write calls this means the operation may or may not have been
    /// committed; callers must confirm before resubmitting.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            RpcError::Unreachable {
                phase: TransportPhase::Exchange,
                ..
            }
        )
    }

    /// True when the engine refused the bearer credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RpcError::EngineRejected { status: 401, .. })
    }
}

/// Result type for RPC calls.
pub type RpcResult<T> = Result<T, RpcError>;
