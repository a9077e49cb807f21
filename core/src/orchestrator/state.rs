use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ipward_common::models::{RunId, RunStatus, ScanProgress};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::error;

use crate::progress::ProgressTracker;

/// Lifecycle of the orchestrator.
///
/// ```text
/// Idle ──► Running ──► Completed | Failed | Stopped
///             ▲                    │
///             └────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl Phase {
    pub fn can_transition(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Idle | Completed | Failed | Stopped, Running) | (Running, Completed | Failed | Stopped)
        )
    }

    pub fn is_running(self) -> bool {
        self == Phase::Running
    }
}

impl From<Phase> for RunStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Idle => RunStatus::Pending,
            Phase::Running => RunStatus::Running,
            Phase::Completed => RunStatus::Completed,
            Phase::Failed => RunStatus::Failed,
            Phase::Stopped => RunStatus::Stopped,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Answer to "what is the orchestrator doing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub active: bool,
    /// The live run, or the last one when idle.
    pub run_id: Option<RunId>,
    pub state: Phase,
    pub progress: Option<ScanProgress>,
}

pub(crate) struct ActiveRun {
    pub(crate) run_id: RunId,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) progress: Arc<ProgressTracker>,
    /// Supervisor of the run task.
    pub(crate) handle: Option<JoinHandle<()>>,
}

impl ActiveRun {
    /// The supervisor is gone but the run never settled.
    pub(crate) fn is_orphaned(&self) -> bool {
        self.handle.as_ref().is_some_and(JoinHandle::is_finished)
    }

    pub(crate) fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct RunState {
    pub(crate) phase: Phase,
    pub(crate) run: Option<ActiveRun>,
    pub(crate) last_run_id: Option<RunId>,
    pub(crate) last_progress: Option<ScanProgress>,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            run: None,
            last_run_id: None,
            last_progress: None,
        }
    }

    /// Applies `to` if the table allows it.
    pub(crate) fn transition(&mut self, to: Phase) -> bool {
        if !self.phase.can_transition(to) {
            error!(from = %self.phase, to = %to, "invalid run state transition");
            return false;
        }
        self.phase = to;
        true
    }

    /// Leaves `Running` for a terminal phase and forgets the active run.
    pub(crate) fn finish(&mut self, run_id: RunId, to: Phase) -> bool {
        let is_current = self.run.as_ref().is_some_and(|run| run.run_id == run_id);
        if !is_current || !self.transition(to) {
            return false;
        }
        if let Some(run) = self.run.take() {
            self.last_run_id = Some(run.run_id);
            self.last_progress = Some(run.progress.snapshot());
        }
        true
    }

    pub(crate) fn report(&self) -> StatusReport {
        match &self.run {
            Some(run) => StatusReport {
                active: self.phase.is_running(),
                run_id: Some(run.run_id),
                state: self.phase,
                progress: Some(run.progress.snapshot()),
            },
            None => StatusReport {
                active: false,
                run_id: self.last_run_id,
                state: self.phase,
                progress: self.last_progress,
            },
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
