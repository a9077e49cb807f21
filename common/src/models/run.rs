use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::host::DeviceClass;
use crate::models::range::RangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Stopped
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Probe counters of one run.
///
/// `total` is fixed when the run starts and `current` never exceeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    pub current: u64,
    pub total: u64,
    pub current_address: Option<Ipv4Addr>,
}

impl ScanProgress {
    pub fn new(total: u64) -> Self {
        Self {
            current: 0,
            total,
            current_address: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.total
    }
}

/// Final tally of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub discovered_count: u64,
    pub online: u64,
    pub offline: u64,
    pub by_vendor: BTreeMap<String, u64>,
    pub by_class: BTreeMap<DeviceClass, u64>,
    /// Live addresses that no configured range owns.
    pub unowned: u64,
    pub reconciled: u64,
    pub reconcile_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: RunId,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub range_ids: Vec<RangeId>,
    pub discovered_count: u64,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl ScanRun {
    pub fn start(id: RunId, range_ids: Vec<RangeId>) -> Self {
        Self {
            id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            range_ids,
            discovered_count: 0,
            summary: None,
            error: None,
        }
    }
}

/// Partial update of a stored run. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub finished_at: Option<DateTime<Utc>>,
    pub discovered_count: Option<u64>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl RunUpdate {
    pub fn discovered(count: u64) -> Self {
        Self {
            discovered_count: Some(count),
            ..Self::default()
        }
    }

    pub fn finished(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            finished_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: RunSummary) -> Self {
        self.discovered_count = Some(summary.discovered_count);
        self.summary = Some(summary);
        self
    }

    pub fn with_error(mut self, reason: impl Into<String>) -> Self {
        self.error = Some(reason.into());
        self
    }

    pub fn apply(&self, run: &mut ScanRun) {
        if let Some(status) = self.status {
            run.status = status;
        }
        if let Some(finished_at) = self.finished_at {
            run.finished_at = Some(finished_at);
        }
        if let Some(count) = self.discovered_count {
            run.discovered_count = count;
        }
        if let Some(summary) = &self.summary {
            run.summary = Some(summary.clone());
        }
        if let Some(error) = &self.error {
            run.error = Some(error.clone());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_only_touches_set_fields() {
        let mut run = ScanRun::start(RunId::new(), vec![RangeId::from("lan")]);
        RunUpdate::discovered(3).apply(&mut run);
        assert_eq!(run.discovered_count, 3);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        RunUpdate::finished(RunStatus::Failed)
            .with_error("store offline")
            .apply(&mut run);
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("store offline"));
        assert_eq!(run.discovered_count, 3);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn summary_carries_discovered_count() {
        let summary = RunSummary {
            discovered_count: 2,
            ..RunSummary::default()
        };
        let mut run = ScanRun::start(RunId::new(), Vec::new());
        RunUpdate::finished(RunStatus::Completed)
            .with_summary(summary.clone())
            .apply(&mut run);
        assert_eq!(run.discovered_count, 2);
        assert_eq!(run.summary, Some(summary));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }
}
