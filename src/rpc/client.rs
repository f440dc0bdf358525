//! Authenticated RPC client for the engine.
//!
//! # Responsibilities
//! - Attach the bearer credential and a request id to every call
//! - Bound every call by one deadline covering dial and exchange
//! - Decode each response into its schema or fail with `ProtocolMismatch`
//!
//! The client never retries. Write calls (`shield`, `swap`, `pay`) can move
//! funds irreversibly, so an ambiguous failure is returned as-is for the
//! caller to resolve.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use crate::credentials::BearerToken;
use crate::rpc::endpoint::Endpoint;
use crate::rpc::error::{RpcError, RpcResult, TransportPhase};
use crate::rpc::transport::{self, ExchangeError};
use crate::rpc::types::{
    EngineStatus, HistoryEntry, MarketSnapshot, PayReceipt, PayRequest, ShieldReceipt,
    ShieldRequest, SwapReceipt, SwapRequest,
};

/// Default per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on a response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Request id header name.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logical engine resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Health,
    History,
    Market,
    Shield,
    Swap,
    Pay,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Health => "/health",
            Resource::History => "/v1/history",
            Resource::Market => "/v1/market",
            Resource::Shield => "/v1/shield",
            Resource::Swap => "/v1/swap",
            Resource::Pay => "/v1/pay",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Health => "health",
            Resource::History => "history",
            Resource::Market => "market",
            Resource::Shield => "shield",
            Resource::Swap => "swap",
            Resource::Pay => "pay",
        }
    }

    /// True for resources that change engine state.
    pub fn is_write(&self) -> bool {
        matches!(self, Resource::Shield | Resource::Swap | Resource::Pay)
    }

    fn method(&self) -> Method {
        if self.is_write() {
            Method::POST
        } else {
            Method::GET
        }
    }
}

/// Client bound to one engine endpoint and one session credential.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: Endpoint,
    token: BearerToken,
    timeout: Duration,
    max_response_bytes: usize,
}

impl RpcClient {
    /// Create a client with the default request timeout.
    pub fn new(endpoint: Endpoint, token: BearerToken) -> Self {
        Self {
            endpoint,
            token,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the response body cap. Larger bodies fail with `ProtocolMismatch`.
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Engine identity and operational state. Also the readiness probe.
    pub async fn get_status(&self) -> RpcResult<EngineStatus> {
        self.call(Resource::Health, None).await
    }

    /// Past transactions in the order the engine returns them.
    pub async fn get_history(&self) -> RpcResult<Vec<HistoryEntry>> {
        self.call(Resource::History, None).await
    }

    pub async fn get_market(&self) -> RpcResult<MarketSnapshot> {
        self.call(Resource::Market, None).await
    }

    /// Route `amount_lamports` to `destination` through `strategy`.
    ///
    /// `force` overrides a risk-based refusal by the engine.
    pub async fn shield(
        &self,
        amount_lamports: u64,
        destination: &str,
        strategy: &str,
        force: bool,
    ) -> RpcResult<ShieldReceipt> {
        let request = ShieldRequest {
            amount_lamports,
            destination_addr: destination.to_string(),
            strategy: strategy.to_string(),
            force,
        };
        self.post(Resource::Shield, &request).await
    }

    pub async fn swap(
        &self,
        amount_lamports: u64,
        from_token: &str,
        to_token: &str,
    ) -> RpcResult<SwapReceipt> {
        let request = SwapRequest {
            amount_lamports,
            from_token: from_token.to_string(),
            to_token: to_token.to_string(),
        };
        self.post(Resource::Swap, &request).await
    }

    pub async fn pay(&self, amount_lamports: u64, merchant_id: &str) -> RpcResult<PayReceipt> {
        let request = PayRequest {
            amount_lamports,
            merchant_id: merchant_id.to_string(),
        };
        self.post(Resource::Pay, &request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: &B,
    ) -> RpcResult<T> {
        let body = serde_json::to_vec(body).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
        self.call(resource, Some(body)).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: Option<Vec<u8>>,
    ) -> RpcResult<T> {
        let deadline = Instant::now() + self.timeout;
        let request_id = Uuid::new_v4();
        let request = self.build_request(resource, body, request_id)?;

        let io = match timeout_at(deadline, transport::connect(&self.endpoint)).await {
            Ok(Ok(io)) => io,
            Ok(Err(e)) => return Err(self.unreachable(TransportPhase::Connect, e.to_string())),
            Err(_) => {
                return Err(self.unreachable(
                    TransportPhase::Connect,
                    format!("connect timed out after {}ms", self.timeout.as_millis()),
                ))
            }
        };

        let exchange = transport::exchange(io, request, self.max_response_bytes);
        let (status, body) = match timeout_at(deadline, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(ExchangeError::BodyTooLarge { limit })) => {
                return Err(RpcError::ProtocolMismatch {
                    resource: resource.name(),
                    reason: format!("response body exceeds {} bytes", limit),
                })
            }
            Ok(Err(e)) => return Err(self.unreachable(TransportPhase::Exchange, e.to_string())),
            Err(_) => {
                return Err(self.unreachable(
                    TransportPhase::Exchange,
                    format!("no response within {}ms", self.timeout.as_millis()),
                ))
            }
        };

        tracing::debug!(
            resource = resource.name(),
            request_id = %request_id,
            status = status.as_u16(),
            bytes = body.len(),
            "Engine call completed"
        );

        if !status.is_success() {
            return Err(RpcError::EngineRejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| RpcError::ProtocolMismatch {
            resource: resource.name(),
            reason: e.to_string(),
        })
    }

    fn build_request(
        &self,
        resource: Resource,
        body: Option<Vec<u8>>,
        request_id: Uuid,
    ) -> RpcResult<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(resource.method())
            .uri(resource.path())
            .header(header::HOST, self.endpoint.authority())
            .header(header::AUTHORIZATION, self.token.header_value())
            .header(header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }

        builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| RpcError::InvalidRequest(e.to_string()))
    }

    fn unreachable(&self, phase: TransportPhase, reason: String) -> RpcError {
        RpcError::Unreachable {
            endpoint: self.endpoint.to_string(),
            phase,
            reason,
        }
    }
}

/// Best human-readable message from an error response.
fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
