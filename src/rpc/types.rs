//! Request and response schemas for the engine RPC surface.
//!
//! Every resource has an explicit schema. A response that does not decode
//! into its schema is a protocol mismatch, never a partially-filled value.
//! Amounts are integer base units (lamports).

use serde::{Deserialize, Serialize};

/// Strategy used when the caller does not name one.
pub const DEFAULT_STRATEGY: &str = "privacy_cash";

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Engine identity.
    pub engine: String,
    /// Operational state as reported by the engine (e.g. "ready").
    pub status: String,
    /// Protocol version, when the engine reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// One entry of `GET /v1/history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub amount_lamports: u64,
    pub destination: String,
    pub provider: String,
    pub status: String,
    pub tx_hash: String,
}

/// `GET /v1/market` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub asset: String,
    pub price_usd: f64,
    /// Data provider identity.
    pub provider: String,
}

/// `POST /v1/shield` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldRequest {
    pub amount_lamports: u64,
    pub destination_addr: String,
    pub strategy: String,
    /// Overrides a risk-based refusal.
    #[serde(default)]
    pub force: bool,
}

/// `POST /v1/shield` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldReceipt {
    pub tx_hash: String,
    pub provider: String,
    /// Private note needed to later withdraw, if the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// `POST /v1/swap` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub amount_lamports: u64,
    pub from_token: String,
    pub to_token: String,
}

/// `POST /v1/swap` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub tx_hash: String,
    /// Amount received, in base units of the target asset.
    pub to_amount: u64,
}

/// `POST /v1/pay` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayRequest {
    pub amount_lamports: u64,
    pub merchant_id: String,
}

/// `POST /v1/pay` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayReceipt {
    pub tx_hash: String,
    pub receipt_id: String,
}
