use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Engine supervision errors.
///
/// Every variant is fatal to the current start attempt. No process is left
/// running when one is returned, so the caller may start again.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("engine binary not found (searched: {})", display_paths(.searched))]
    BinaryNotFound { searched: Vec<PathBuf> },

    #[error("engine keystore requires a passphrase (set PRISM_PASSPHRASE)")]
    PassphraseRequired,

    #[error("failed to launch engine {}: {source}", .path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine not ready after {}ms ({probes} probes){}", .elapsed.as_millis(), last_error_suffix(.last_error))]
    ReadinessTimeout {
        elapsed: Duration,
        probes: u32,
        last_error: Option<String>,
    },

    #[error("engine exited before becoming ready ({status})")]
    ProcessExitedEarly { status: String, probes: u32 },

    #[error("engine already running (pid {})", .pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into()))]
    AlreadyRunning { pid: Option<u32> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidates".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(": {}", e),
        None => String::new(),
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
