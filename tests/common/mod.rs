//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use prism_sidecar::credentials::BearerToken;
use prism_sidecar::lifecycle::Shutdown;
use prism_sidecar::mock_engine::{self, MockEngineState};
use prism_sidecar::rpc::{Endpoint, RpcClient};
use prism_sidecar::secrets::{MachineIdentity, SecretStore};

pub const TEST_TOKEN: &str = "test-session-token";

pub fn token() -> BearerToken {
    BearerToken::new(TEST_TOKEN)
}

/// Path of the `mock-engine` binary built for this test run.
pub fn mock_engine_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock-engine"))
}

/// Store under `dir` keyed to a fixed identity.
pub fn test_store(dir: &Path) -> SecretStore {
    let identity = MachineIdentity::new("test-host", "linux", "x86_64");
    SecretStore::with_identity(dir.join("store"), &identity).unwrap()
}

/// In-process mock engine running on a spawned task.
pub struct MockServer {
    pub endpoint: Endpoint,
    pub state: MockEngineState,
    shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
    _dir: Option<tempfile::TempDir>,
}

impl MockServer {
    /// Serve on a socket in a fresh temp directory.
    pub async fn unix(state: MockEngineState) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sock");
        let listener = mock_engine::bind_unix(&path).unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(mock_engine::serve_unix(
            listener,
            state.clone(),
            shutdown.clone(),
        ));
        Self {
            endpoint: Endpoint::unix(path),
            state,
            shutdown,
            handle,
            _dir: Some(dir),
        }
    }

    /// Serve on an ephemeral loopback port.
    pub async fn tcp(state: MockEngineState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(mock_engine::serve_tcp(
            listener,
            state.clone(),
            shutdown.clone(),
        ));
        Self {
            endpoint: Endpoint::loopback(port),
            state,
            shutdown,
            handle,
            _dir: None,
        }
    }

    pub fn client(&self) -> RpcClient {
        RpcClient::new(self.endpoint.clone(), token()).with_timeout(Duration::from_secs(2))
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(2), self.handle).await;
    }
}

/// Start a programmable raw HTTP backend on an ephemeral port.
///
/// Every connection reads one request head and writes `f()`'s status and
/// body with `Connection: close`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = std::sync::Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            403 => "403 Forbidden",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// A loopback port with nothing listening.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
