/// Lifecycle of the supervised engine.
///
/// ```text
/// Idle → Starting → Ready ─┐
///           └─────→ Failed ┴→ Stopped
/// ```
/// `Ready` and `Failed` are terminal for one start attempt; a new attempt
/// begins again at `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Starting,
    Ready,
    Failed,
    Stopped,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Ready => "ready",
            SupervisorState::Failed => "failed",
            SupervisorState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
