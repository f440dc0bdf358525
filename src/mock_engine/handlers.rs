use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::mock_engine::MockEngineState;
use crate::rpc::types::{
    EngineStatus, HistoryEntry, MarketSnapshot, PayReceipt, PayRequest, ShieldReceipt,
    ShieldRequest, SwapReceipt, SwapRequest,
};

/// Protocol version reported by the mock.
pub const PROTOCOL_VERSION: &str = "1";

/// Lamports per SOL.
const LAMPORTS_PER_SOL: u128 = 1_000_000_000;

/// Mock SOL price in USD cents.
const SOL_PRICE_CENTS: u128 = 15_000;

/// Error body `{"error": "..."}` with a status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub async fn health(State(state): State<MockEngineState>) -> Response {
    state.record_health_probe();
    if state.is_malformed() {
        return Json(json!({ "status": 42 })).into_response();
    }
    Json(EngineStatus {
        engine: "mock".to_string(),
        status: "ready".to_string(),
        protocol: Some(PROTOCOL_VERSION.to_string()),
    })
    .into_response()
}

pub async fn history(State(state): State<MockEngineState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history())
}

pub async fn market() -> Json<MarketSnapshot> {
    Json(MarketSnapshot {
        asset: "SOL".to_string(),
        price_usd: SOL_PRICE_CENTS as f64 / 100.0,
        provider: "mock-oracle".to_string(),
    })
}

pub async fn shield(
    State(state): State<MockEngineState>,
    Json(req): Json<ShieldRequest>,
) -> Result<Json<ShieldReceipt>, ApiError> {
    require_amount(req.amount_lamports)?;
    if req.destination_addr.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "destination is required"));
    }
    if !req.force && req.destination_addr.to_ascii_lowercase().contains("risk") {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "High risk destination address",
        ));
    }

    let tx_hash = new_tx_hash();
    let provider = provider_for(&req.strategy);
    state.record(&tx_hash, req.amount_lamports, &req.destination_addr, provider);

    tracing::info!(amount = req.amount_lamports, strategy = %req.strategy, "Shield accepted");
    Ok(Json(ShieldReceipt {
        note: Some(format!("prism-note-{}", Uuid::new_v4().simple())),
        status: Some("Confirmed".to_string()),
        provider: provider.to_string(),
        tx_hash,
    }))
}

pub async fn swap(
    State(state): State<MockEngineState>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<SwapReceipt>, ApiError> {
    require_amount(req.amount_lamports)?;
    if req.from_token.eq_ignore_ascii_case(&req.to_token) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "from_token and to_token must differ",
        ));
    }

    let to_amount = convert(req.amount_lamports, &req.from_token, &req.to_token);
    let tx_hash = new_tx_hash();
    state.record(
        &tx_hash,
        req.amount_lamports,
        &format!("{}->{}", req.from_token, req.to_token),
        "Jupiter",
    );

    Ok(Json(SwapReceipt { tx_hash, to_amount }))
}

pub async fn pay(
    State(state): State<MockEngineState>,
    Json(req): Json<PayRequest>,
) -> Result<Json<PayReceipt>, ApiError> {
    require_amount(req.amount_lamports)?;
    if req.merchant_id.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "merchant_id is required"));
    }

    let tx_hash = new_tx_hash();
    state.record(&tx_hash, req.amount_lamports, &req.merchant_id, "Private Pay");

    Ok(Json(PayReceipt {
        tx_hash,
        receipt_id: format!("rcpt_{}", Uuid::new_v4().simple()),
    }))
}

fn require_amount(amount: u64) -> Result<(), ApiError> {
    if amount == 0 {
        Err(ApiError::new(StatusCode::BAD_REQUEST, "amount must be positive"))
    } else {
        Ok(())
    }
}

fn provider_for(strategy: &str) -> &'static str {
    match strategy {
        "privacy_cash" => "Privacy Cash",
        "shadow_wire" => "ShadowWire",
        _ => "Direct",
    }
}

fn new_tx_hash() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// SOL to USDC (6 decimals) at the mock price; other pairs 1:1.
fn convert(amount: u64, from: &str, to: &str) -> u64 {
    let amount = amount as u128;
    let out = match (from.to_ascii_uppercase().as_str(), to.to_ascii_uppercase().as_str()) {
        ("SOL", "USDC") => amount * SOL_PRICE_CENTS * 10_000 / LAMPORTS_PER_SOL,
        ("USDC", "SOL") => amount * LAMPORTS_PER_SOL / (SOL_PRICE_CENTS * 10_000),
        _ => amount,
    };
    u64::try_from(out).unwrap_or(u64::MAX)
}
