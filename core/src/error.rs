use ipward_common::error::{RangeError, StoreError};
use ipward_common::models::{RangeId, RunId};
use thiserror::Error;

/// Reasons a run cannot start or had to abort.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("scan run {run_id} is already running")]
    AlreadyRunning { run_id: RunId },

    #[error("unknown address range: {0}")]
    UnknownRange(RangeId),

    #[error("no address ranges to scan")]
    NoTargets,

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
