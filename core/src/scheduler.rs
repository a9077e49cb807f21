//! # Batch Scheduler
//!
//! Drives a [`Prober`] over every usable address of one range. Addresses are
//! probed in fixed-size batches; a batch runs fully concurrently and the next
//! one starts only after it finished and a short pause elapsed. Cancellation
//! is honoured between batches, never in the middle of one.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ipward_common::config::Config;
use ipward_common::error::RangeError;
use ipward_common::models::{AddressRange, HostObservation, RunId, ScanEvent};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::events::ProgressBroadcaster;
use crate::prober::Prober;
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub batch_size: usize,
    pub min_prefix: u8,
    pub max_hosts: u64,
    pub inter_batch_delay: Duration,
    /// Longest a single probe may take before it counts as unreachable.
    pub probe_budget: Duration,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        let delay_ms = config.probe.timeout_ms * u64::from(config.scan.inter_batch_delay_percent) / 100;
        Self {
            batch_size: config.scan.batch_size.max(1),
            min_prefix: config.scan.min_prefix,
            max_hosts: config.scan.max_hosts,
            inter_batch_delay: Duration::from_millis(delay_ms),
            probe_budget: config.probe.budget(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Run-wide state the scheduler reports into.
pub struct ScanContext<'a> {
    pub run_id: RunId,
    pub progress: &'a ProgressTracker,
    pub cancel: &'a AtomicBool,
    pub events: &'a ProgressBroadcaster,
}

impl ScanContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Outcome of scanning one range.
#[derive(Debug, Default)]
pub struct RangeScan {
    /// Live hosts in address order.
    pub live: Vec<HostObservation>,
    /// Every address that was actually probed.
    pub probed: Vec<Ipv4Addr>,
    /// Stopped before every batch ran.
    pub cancelled: bool,
}

pub struct BatchScheduler {
    prober: Arc<dyn Prober>,
    settings: ScanSettings,
}

impl BatchScheduler {
    pub fn new(prober: Arc<dyn Prober>, settings: ScanSettings) -> Self {
        Self { prober, settings }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Number of addresses a scan of `range` will probe, or why it is refused.
    pub fn validate(&self, range: &AddressRange) -> Result<u64, RangeError> {
        let network = range.network;
        if network.prefix() < self.settings.min_prefix {
            return Err(RangeError::PrefixTooShort {
                network: network.to_string(),
                prefix: network.prefix(),
                min_prefix: self.settings.min_prefix,
            });
        }
        let hosts = network.usable_count();
        if hosts > self.settings.max_hosts {
            return Err(RangeError::TooManyHosts {
                network: network.to_string(),
                hosts,
                max_hosts: self.settings.max_hosts,
            });
        }
        Ok(hosts)
    }

    /// Probes every usable address of `range`.
    ///
    /// After each batch the run-wide progress is advanced and published, and
    /// `on_batch` receives the live hosts of that batch (if any).
    pub async fn scan_range<F>(
        &self,
        range: &AddressRange,
        ctx: &ScanContext<'_>,
        mut on_batch: F,
    ) -> Result<RangeScan, RangeError>
    where
        F: FnMut(&[HostObservation]),
    {
        self.validate(range)?;
        let targets: Vec<Ipv4Addr> = range.network.usable_range().iter().collect();
        let mut scan = RangeScan::default();

        for (index, batch) in targets.chunks(self.settings.batch_size).enumerate() {
            if index > 0 && !self.settings.inter_batch_delay.is_zero() && !ctx.is_cancelled() {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }
            if ctx.is_cancelled() {
                debug!(run_id = %ctx.run_id, range = %range.id, "cancelled between batches");
                scan.cancelled = true;
                break;
            }

            let mut observations = self.probe_batch(batch).await;
            observations.sort_by_key(|obs| obs.address);
            scan.probed.extend_from_slice(batch);

            let progress = ctx.progress.advance(batch.len() as u64, batch.last().copied());
            ctx.events.publish(ScanEvent::ProgressUpdated {
                run_id: ctx.run_id,
                progress,
            });

            let found: Vec<HostObservation> =
                observations.into_iter().filter(|obs| obs.alive).collect();
            if !found.is_empty() {
                on_batch(&found);
                scan.live.extend(found);
            }
        }

        Ok(scan)
    }

    async fn probe_batch(&self, batch: &[Ipv4Addr]) -> Vec<HostObservation> {
        let mut probes = JoinSet::new();
        for addr in batch.iter().copied() {
            let prober = Arc::clone(&self.prober);
            let budget = self.settings.probe_budget;
            probes.spawn(async move {
                match tokio::time::timeout(budget, prober.probe(addr)).await {
                    Ok(obs) => obs,
                    Err(_) => {
                        debug!(%addr, ?budget, "probe overran its budget");
                        HostObservation::unreachable(addr)
                    }
                }
            });
        }

        let mut observations = Vec::with_capacity(batch.len());
        while let Some(result) = probes.join_next().await {
            match result {
                Ok(obs) => observations.push(obs),
                Err(e) => warn!("probe task failed: {e}"),
            }
        }
        observations
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
