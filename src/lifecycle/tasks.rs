//! Supervised advisory tasks.
//!
//! # Responsibilities
//! - Own every background task a component spawns (no detached tasks)
//! - Broadcast cancellation on shutdown and abort stragglers after a grace
//! - Abort everything still running when the group is dropped
//!
//! # Design Decisions
//! - Only advisory work runs here: a failure is logged and swallowed, and
//!   nothing the caller depends on for correctness may be spawned this way

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::lifecycle::shutdown::Shutdown;

/// Group of advisory tasks sharing one shutdown signal.
pub struct TaskGroup {
    tasks: JoinSet<()>,
    shutdown: Shutdown,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Spawn an advisory task.
    ///
    /// The task stops early when the group shuts down. An `Err` result is
    /// logged at WARN and otherwise ignored.
    pub fn spawn_advisory<F, E>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                result = task => {
                    if let Err(e) = result {
                        tracing::warn!(task = name, error = %e, "Advisory task failed");
                    }
                }
                _ = shutdown.wait() => {
                    tracing::debug!(task = name, "Advisory task cancelled");
                }
            }
        });
    }

    /// Number of tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every task, wait up to `grace`, then abort the rest.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.shutdown.trigger();
        let deadline = Instant::now() + grace;

        while !self.tasks.is_empty() {
            match timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(Err(e))) if e.is_panic() => {
                    tracing::warn!(error = %e, "Advisory task panicked");
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(remaining = self.tasks.len(), "Aborting advisory tasks");
                    self.tasks.abort_all();
                    while self.tasks.join_next().await.is_some() {}
                    break;
                }
            }
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}
