//! In-process stand-in for the engine.
//!
//! Serves the engine RPC surface with canned behavior so the client and the
//! supervisor can be exercised without the real engine.
//!
//! # Responsibilities
//! - Enforce the bearer credential on every route (401 otherwise)
//! - Keep an in-memory history, most recent first
//! - Refuse "risk" destinations unless forced (403)
//! - Optionally answer health with a malformed body
//!
//! The `mock-engine` binary wraps this module with the engine's environment
//! contract plus knobs for startup delay and immediate exit.

pub mod auth;
pub mod handlers;

use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::{TcpListener, UnixListener};
use tower_http::trace::TraceLayer;

use crate::credentials::BearerToken;
use crate::lifecycle::Shutdown;
use crate::rpc::types::HistoryEntry;
use crate::rpc::Endpoint;

/// Delay before the mock binds its listener (milliseconds).
pub const STARTUP_DELAY_ENV_VAR: &str = "MOCK_ENGINE_STARTUP_DELAY_MS";

/// Exit immediately with this code instead of serving.
pub const EXIT_CODE_ENV_VAR: &str = "MOCK_ENGINE_EXIT_CODE";

/// Serve a malformed health body when set to a non-empty value other than `0`.
pub const MALFORMED_ENV_VAR: &str = "MOCK_ENGINE_MALFORMED";

/// Shared mock state. Cheap to clone.
#[derive(Clone)]
pub struct MockEngineState {
    inner: Arc<Inner>,
}

struct Inner {
    token: BearerToken,
    malformed: bool,
    history: Mutex<Vec<HistoryEntry>>,
    next_id: AtomicU64,
    health_probes: AtomicU32,
}

impl MockEngineState {
    pub fn new(token: BearerToken) -> Self {
        Self::with_malformed_health(token, false)
    }

    /// When `malformed` is set, health answers with a body that does not
    /// match the schema.
    pub fn with_malformed_health(token: BearerToken, malformed: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                malformed,
                history: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                health_probes: AtomicU32::new(0),
            }),
        }
    }

    pub fn token(&self) -> &BearerToken {
        &self.inner.token
    }

    pub fn is_malformed(&self) -> bool {
        self.inner.malformed
    }

    /// Health requests served so far.
    pub fn health_probes(&self) -> u32 {
        self.inner.health_probes.load(Ordering::SeqCst)
    }

    /// Snapshot of the history, most recent first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner
            .history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub(crate) fn record_health_probe(&self) {
        self.inner.health_probes.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record(&self, tx_hash: &str, amount: u64, destination: &str, provider: &str) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = HistoryEntry {
            id: id.to_string(),
            amount_lamports: amount,
            destination: destination.to_string(),
            provider: provider.to_string(),
            status: "Confirmed".to_string(),
            tx_hash: tx_hash.to_string(),
        };
        if let Ok(mut history) = self.inner.history.lock() {
            history.insert(0, entry);
        }
    }
}

/// Build the engine router.
pub fn router(state: MockEngineState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/history", get(handlers::history))
        .route("/v1/market", get(handlers::market))
        .route("/v1/shield", post(handlers::shield))
        .route("/v1/swap", post(handlers::swap))
        .route("/v1/pay", post(handlers::pay))
        .layer(middleware::from_fn_with_state(state.clone(), auth::bearer_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `endpoint` and serve until `shutdown` triggers.
pub async fn serve(
    endpoint: &Endpoint,
    state: MockEngineState,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    match endpoint {
        Endpoint::Unix(path) => {
            let listener = bind_unix(path)?;
            let result = serve_unix(listener, state, shutdown).await;
            let _ = std::fs::remove_file(path);
            result
        }
        Endpoint::Tcp { host, port } => {
            let listener = TcpListener::bind((host.as_str(), *port)).await?;
            serve_tcp(listener, state, shutdown).await
        }
    }
}

/// Bind a Unix listener, replacing a leftover socket file.
pub fn bind_unix(path: &Path) -> std::io::Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

pub async fn serve_unix(
    listener: UnixListener,
    state: MockEngineState,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    tracing::info!(address = ?listener.local_addr()?, "Mock engine listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

pub async fn serve_tcp(
    listener: TcpListener,
    state: MockEngineState,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "Mock engine listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
