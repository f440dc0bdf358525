//! Engine process supervisor.
//!
//! # Responsibilities
//! - Launch the engine with its credentials in the environment only
//! - Hold callers until the engine answers a health probe
//! - Kill the child on any failed start, on `stop`, and on drop

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::SidecarConfig;
use crate::credentials::{BearerToken, Passphrase, AUTH_TOKEN_ENV_VAR, PASSPHRASE_ENV_VAR};
use crate::lifecycle::TaskGroup;
use crate::rpc::endpoint::{HOST_ENV_VAR, PORT_ENV_VAR, SOCKET_PATH_ENV_VAR};
use crate::rpc::{Endpoint, RpcClient, DEFAULT_REQUEST_TIMEOUT};
use crate::secrets::SecretStore;
use crate::supervisor::binary::EngineBinary;
use crate::supervisor::error::{SupervisorError, SupervisorResult};
use crate::supervisor::readiness::{wait_until_ready, NotReady, Readiness};
use crate::supervisor::state::SupervisorState;

/// Default interval between health probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default upper bound for a start attempt.
pub const DEFAULT_READINESS_DEADLINE: Duration = Duration::from_secs(10);

/// How long output forwarders get to drain on stop.
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// Static launch parameters.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub endpoint: Endpoint,
    pub binary: EngineBinary,
    /// Destination for embedded binaries.
    pub bin_dir: PathBuf,
    pub poll_interval: Duration,
    /// Timeout of each health probe, further bounded by the start deadline.
    pub probe_timeout: Duration,
    /// Refuse to start without a passphrase.
    pub require_passphrase: bool,
    /// Additional child environment.
    pub extra_env: Vec<(String, String)>,
}

impl SupervisorConfig {
    pub fn new(endpoint: Endpoint, binary: EngineBinary, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoint,
            binary,
            bin_dir: bin_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe_timeout: DEFAULT_REQUEST_TIMEOUT,
            require_passphrase: true,
            extra_env: Vec::new(),
        }
    }

    /// Build from the sidecar configuration and the store it points at.
    pub fn from_config(config: &SidecarConfig, store: &SecretStore) -> Self {
        let engine = &config.engine;
        let binary = match &engine.binary_path {
            Some(path) => EngineBinary::Path(path.clone()),
            None if !engine.search_paths.is_empty() => {
                EngineBinary::Search(engine.search_paths.clone())
            }
            None => EngineBinary::search_default(&engine.binary_name),
        };

        let extra_env = engine
            .extra_env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            endpoint: config.endpoint(store),
            binary,
            bin_dir: store.bin_dir(),
            poll_interval: Duration::from_millis(config.readiness.poll_interval_ms),
            probe_timeout: Duration::from_millis(config.rpc.request_timeout_ms),
            require_passphrase: engine.require_passphrase,
            extra_env,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_require_passphrase(mut self, require: bool) -> Self {
        self.require_passphrase = require;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }
}

/// Owner of exactly one engine subprocess.
///
/// `start` and `stop` take `&mut self`, so calls on one supervisor are
/// serialized by the borrow checker.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    state: SupervisorState,
    child: Option<Child>,
    output: TaskGroup,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            state: SupervisorState::Idle,
            child: None,
            output: TaskGroup::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Process id of the owned engine, while it runs.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Client for the supervised engine.
    pub fn client(&self, token: BearerToken) -> RpcClient {
        RpcClient::new(self.config.endpoint.clone(), token).with_timeout(self.config.probe_timeout)
    }

    /// Launch the engine and wait until it answers a health probe.
    ///
    /// `deadline` bounds the whole readiness wait. On any error the launched
    /// process has already been killed.
    pub async fn start(
        &mut self,
        deadline: Duration,
        token: &BearerToken,
        passphrase: Option<&Passphrase>,
    ) -> SupervisorResult<Readiness> {
        let running = match self.child.as_mut() {
            Some(child) => !matches!(child.try_wait(), Ok(Some(_))),
            None => false,
        };
        if running {
            return Err(SupervisorError::AlreadyRunning { pid: self.pid() });
        }
        if self.child.is_some() {
            // Previous engine died on its own; reap it first.
            self.stop().await;
        }

        if self.config.require_passphrase && passphrase.is_none() {
            return Err(SupervisorError::PassphraseRequired);
        }

        let path = self.config.binary.resolve(&self.config.bin_dir)?;
        self.remove_stale_socket();

        let mut command = Command::new(&path);
        command
            .env_remove(SOCKET_PATH_ENV_VAR)
            .env_remove(PORT_ENV_VAR)
            .env_remove(HOST_ENV_VAR)
            .env_remove(PASSPHRASE_ENV_VAR)
            .env(AUTH_TOKEN_ENV_VAR, token.expose())
            .envs(self.config.endpoint.to_env())
            .envs(self.config.extra_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(passphrase) = passphrase {
            command.env(PASSPHRASE_ENV_VAR, passphrase.expose());
        }

        let mut child = spawn(&mut command).await.map_err(|source| SupervisorError::SpawnFailed {
            path: path.clone(),
            source,
        })?;

        self.state = SupervisorState::Starting;
        tracing::info!(
            path = %path.display(),
            pid = child.id(),
            endpoint = %self.config.endpoint,
            "Engine launched"
        );

        self.output = TaskGroup::new();
        self.forward_output(&mut child);

        let probe = self.client(token.clone());
        match wait_until_ready(&mut child, &probe, deadline, self.config.poll_interval).await {
            Ok(readiness) => {
                self.state = SupervisorState::Ready;
                self.child = Some(child);
                tracing::info!(
                    probes = readiness.probes,
                    elapsed_ms = readiness.elapsed.as_millis() as u64,
                    "Engine ready"
                );
                Ok(readiness)
            }
            Err(not_ready) => {
                self.state = SupervisorState::Failed;
                terminate(&mut child).await;
                self.output.shutdown(OUTPUT_GRACE).await;

                let err = match not_ready {
                    NotReady::TimedOut {
                        probes,
                        elapsed,
                        last_error,
                    } => SupervisorError::ReadinessTimeout {
                        elapsed,
                        probes,
                        last_error,
                    },
                    NotReady::Exited { status, probes } => SupervisorError::ProcessExitedEarly {
                        status: status.to_string(),
                        probes,
                    },
                };
                tracing::warn!(error = %err, "Engine failed to start");
                Err(err)
            }
        }
    }

    /// Kill the engine if one is running and end the current lifecycle.
    ///
    /// A no-op on a supervisor that was never started or is already stopped.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            terminate(&mut child).await;
            self.remove_stale_socket();
            tracing::info!(pid = pid, "Engine stopped");
        }
        if !matches!(self.state, SupervisorState::Idle | SupervisorState::Stopped) {
            self.state = SupervisorState::Stopped;
        }
        self.output.shutdown(OUTPUT_GRACE).await;
    }

    fn forward_output(&mut self, child: &mut Child) {
        if let Some(stdout) = child.stdout.take() {
            self.output.spawn_advisory("engine-stdout", async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    tracing::info!(target: "engine", stream = "stdout", "{}", line);
                }
                Ok::<(), std::io::Error>(())
            });
        }
        if let Some(stderr) = child.stderr.take() {
            self.output.spawn_advisory("engine-stderr", async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    tracing::warn!(target: "engine", stream = "stderr", "{}", line);
                }
                Ok::<(), std::io::Error>(())
            });
        }
    }

    fn remove_stale_socket(&self) {
        if let Some(path) = self.config.endpoint.socket_path() {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed engine socket"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove engine socket"
                ),
            }
        }
    }
}

/// Spawn, retrying briefly on ETXTBSY.
///
/// A freshly materialized binary can still be open for writing in a child
/// forked concurrently by another thread.
async fn spawn(command: &mut Command) -> std::io::Result<Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if is_text_busy(&e) && attempts < 5 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            result => return result,
        }
    }
}

fn is_text_busy(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

/// Kill and reap the child.
async fn terminate(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => {}
        _ => {
            if let Err(e) = child.kill().await {
                tracing::warn!(pid = child.id(), error = %e, "Failed to kill engine");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> SupervisorConfig {
        SupervisorConfig::new(
            Endpoint::unix(dir.join("engine.sock")),
            EngineBinary::Path(dir.join("missing-engine")),
            dir.join("bin"),
        )
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = ProcessSupervisor::new(config(dir.path()));
        supervisor.stop().await;
        supervisor.stop().await;
        assert_eq!(supervisor.state(), SupervisorState::Idle);
        assert_eq!(supervisor.pid(), None);
    }

    #[tokio::test]
    async fn test_passphrase_checked_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = ProcessSupervisor::new(config(dir.path()));
        let err = supervisor
            .start(Duration::from_secs(1), &BearerToken::new("t"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::PassphraseRequired));
        assert_eq!(supervisor.state(), SupervisorState::Idle);
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor =
            ProcessSupervisor::new(config(dir.path()).with_require_passphrase(false));
        let err = supervisor
            .start(Duration::from_secs(1), &BearerToken::new("t"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::BinaryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_stale_socket_removed_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("engine.sock");
        std::fs::write(&socket, b"leftover").unwrap();

        let script = b"#!/bin/sh\nexit 3\n".to_vec();
        let cfg = SupervisorConfig::new(
            Endpoint::unix(&socket),
            EngineBinary::embedded("engine", script),
            dir.path().join("bin"),
        )
        .with_require_passphrase(false)
        .with_poll_interval(Duration::from_millis(50));

        let mut supervisor = ProcessSupervisor::new(cfg);
        let err = supervisor
            .start(Duration::from_secs(5), &BearerToken::new("t"), None)
            .await
            .unwrap_err();

        assert!(!socket.exists());
        match err {
            SupervisorError::ProcessExitedEarly { status, .. } => assert!(status.contains('3')),
            other => panic!("expected ProcessExitedEarly, got {other:?}"),
        }
        assert_eq!(supervisor.state(), SupervisorState::Failed);

        supervisor.stop().await;
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
        supervisor.stop().await;
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }
}
