//! Readiness gate.
//!
//! "Ready" means the engine answered a live health probe, not merely that
//! the process exists. The first probe fires one poll interval after launch;
//! on every tick the child is checked for an early exit before probing.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::{interval_at, sleep_until, timeout_at, Instant, MissedTickBehavior};

use crate::rpc::RpcClient;

/// Outcome of a successful readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// Health probes issued, including the successful one.
    pub probes: u32,
    /// Time from launch to the successful probe.
    pub elapsed: Duration,
}

/// Why the engine never became ready.
#[derive(Debug)]
pub(crate) enum NotReady {
    TimedOut {
        probes: u32,
        elapsed: Duration,
        last_error: Option<String>,
    },
    Exited {
        status: ExitStatus,
        probes: u32,
    },
}

/// Probe `client` every `poll` until it answers, `child` exits, or
/// `deadline` passes.
pub(crate) async fn wait_until_ready(
    child: &mut Child,
    client: &RpcClient,
    deadline: Duration,
    poll: Duration,
) -> Result<Readiness, NotReady> {
    let started = Instant::now();
    let deadline_at = started + deadline;
    let mut ticker = interval_at(started + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut probes = 0u32;
    let mut last_error: Option<String> = None;

    let timed_out = |probes, last_error| NotReady::TimedOut {
        probes,
        elapsed: started.elapsed(),
        last_error,
    };

    loop {
        if Instant::now() >= deadline_at {
            return Err(timed_out(probes, last_error));
        }

        tokio::select! {
            _ = sleep_until(deadline_at) => return Err(timed_out(probes, last_error)),
            status = child.wait() => {
                if let Ok(status) = status {
                    return Err(NotReady::Exited { status, probes });
                }
                // Unable to wait; fall back to probing until the deadline.
                ticker.tick().await;
            }
            _ = ticker.tick() => {}
        }

        if let Ok(Some(status)) = child.try_wait() {
            return Err(NotReady::Exited { status, probes });
        }

        probes += 1;
        match timeout_at(deadline_at, client.get_status()).await {
            Ok(Ok(status)) => {
                let elapsed = started.elapsed();
                tracing::debug!(
                    probes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    engine = %status.engine,
                    state = %status.status,
                    "Engine answered health probe"
                );
                return Ok(Readiness { probes, elapsed });
            }
            Ok(Err(e)) => {
                tracing::trace!(probe = probes, error = %e, "Engine not ready yet");
                last_error = Some(e.to_string());
            }
            Err(_) => return Err(timed_out(probes, last_error)),
        }
    }
}
