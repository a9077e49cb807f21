use std::net::Ipv4Addr;

use serde::Serialize;

use crate::models::range::RangeId;
use crate::models::run::{RunId, RunSummary, ScanProgress};

/// Notification fanned out to run observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanEvent {
    RunStarted {
        run_id: RunId,
        range_ids: Vec<RangeId>,
        total: u64,
    },
    ProgressUpdated {
        run_id: RunId,
        progress: ScanProgress,
    },
    HostsDiscovered {
        run_id: RunId,
        range_id: RangeId,
        addresses: Vec<Ipv4Addr>,
    },
    RangeCompleted {
        run_id: RunId,
        range_id: RangeId,
        count: u64,
    },
    RunCompleted {
        run_id: RunId,
        summary: RunSummary,
    },
    RunFailed {
        run_id: RunId,
        reason: String,
    },
    RunStopped {
        run_id: RunId,
    },
}

impl ScanEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ScanEvent::RunStarted { run_id, .. }
            | ScanEvent::ProgressUpdated { run_id, .. }
            | ScanEvent::HostsDiscovered { run_id, .. }
            | ScanEvent::RangeCompleted { run_id, .. }
            | ScanEvent::RunCompleted { run_id, .. }
            | ScanEvent::RunFailed { run_id, .. }
            | ScanEvent::RunStopped { run_id } => *run_id,
        }
    }

    /// True for the last event a run emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanEvent::RunCompleted { .. } | ScanEvent::RunFailed { .. } | ScanEvent::RunStopped { .. }
        )
    }
}
