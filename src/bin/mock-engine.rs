//! Stand-in engine process.
//!
//! Reads the same environment contract as the real engine
//! (`SHADOWPRISM_AUTH_TOKEN`, `SHADOWPRISM_SOCKET_PATH` or `PORT`) and serves
//! the mock RPC surface until SIGINT/SIGTERM.
//!
//! Test knobs:
//! - `MOCK_ENGINE_STARTUP_DELAY_MS`: wait before binding
//! - `MOCK_ENGINE_EXIT_CODE`: exit immediately with this code
//! - `MOCK_ENGINE_MALFORMED`: answer health with a malformed body

use std::time::Duration;

use prism_sidecar::credentials::{BearerToken, AUTH_TOKEN_ENV_VAR};
use prism_sidecar::lifecycle::{signals, Shutdown};
use prism_sidecar::mock_engine::{
    self, MockEngineState, EXIT_CODE_ENV_VAR, MALFORMED_ENV_VAR, STARTUP_DELAY_ENV_VAR,
};
use prism_sidecar::observability::logging;
use prism_sidecar::rpc::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("info");

    if let Some(code) = env_parse::<i32>(EXIT_CODE_ENV_VAR) {
        eprintln!("mock-engine: exiting with code {}", code);
        std::process::exit(code);
    }

    let token = std::env::var(AUTH_TOKEN_ENV_VAR)
        .ok()
        .filter(|t| !t.is_empty())
        .map(BearerToken::new)
        .ok_or_else(|| format!("{} is not set", AUTH_TOKEN_ENV_VAR))?;

    let endpoint = Endpoint::from_env().ok_or("no listen endpoint in environment")?;

    if let Some(delay_ms) = env_parse::<u64>(STARTUP_DELAY_ENV_VAR) {
        tracing::info!(delay_ms, "Delaying startup");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let malformed = std::env::var(MALFORMED_ENV_VAR)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false);
    let state = MockEngineState::with_malformed_health(token, malformed);

    let shutdown = Shutdown::new();
    let server = mock_engine::serve(&endpoint, state, shutdown.clone());
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = signals::shutdown_signal() => {
            shutdown.trigger();
            server.await?;
        }
    }
    tracing::info!("Mock engine stopped");
    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
