use std::net::Ipv4Addr;
use std::sync::{Mutex, PoisonError};

use ipward_common::models::ScanProgress;

/// Shared probe counters of one run.
///
/// `total` is fixed at construction and `current` only moves forward,
/// saturating at `total`.
#[derive(Debug)]
pub struct ProgressTracker {
    inner: Mutex<ScanProgress>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            inner: Mutex::new(ScanProgress::new(total)),
        }
    }

    pub fn snapshot(&self) -> ScanProgress {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, by: u64, current_address: Option<Ipv4Addr>) -> ScanProgress {
        let mut progress = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        progress.current = progress.current.saturating_add(by).min(progress.total);
        if current_address.is_some() {
            progress.current_address = current_address;
        }
        *progress
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
