//! # Scan Orchestrator
//!
//! Owns the run lifecycle. At most one run is live at a time; it executes on
//! a background task while callers poll [`Orchestrator::get_run_status`] or
//! follow the event stream. Ranges are scanned in order, each one is
//! reconciled as soon as its scan finishes, and every run ends with exactly
//! one terminal event.

mod state;

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ipward_common::config::Config;
use ipward_common::models::{
    AddressRange, HostObservation, RangeId, RunId, RunStatus, RunSummary, RunUpdate, ScanEvent,
    ScanRun,
};
use ipward_common::store::{HostRepository, RangeRepository, RunRepository};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use state::{Phase, StatusReport};
use state::{ActiveRun, RunState};

use crate::error::RunError;
use crate::events::{ProgressBroadcaster, SubscriberId, Subscription};
use crate::prober::Prober;
use crate::progress::ProgressTracker;
use crate::reconcile::{Reconciled, Reconciler};
use crate::resolver::RangeResolver;
use crate::scheduler::{BatchScheduler, RangeScan, ScanContext, ScanSettings};

const ORPHANED_REASON: &str = "run task ended without reporting a result";

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    ranges: Arc<dyn RangeRepository>,
    runs: Arc<dyn RunRepository>,
    scheduler: BatchScheduler,
    reconciler: Reconciler,
    events: ProgressBroadcaster,
    state: Mutex<RunState>,
    phase: watch::Sender<Phase>,
}

struct RunPlan {
    run_id: RunId,
    targets: Vec<AddressRange>,
    cancel: Arc<AtomicBool>,
    progress: Arc<ProgressTracker>,
}

impl Orchestrator {
    pub fn new(
        ranges: Arc<dyn RangeRepository>,
        hosts: Arc<dyn HostRepository>,
        runs: Arc<dyn RunRepository>,
        prober: Arc<dyn Prober>,
        config: &Config,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            inner: Arc::new(Inner {
                ranges,
                runs,
                scheduler: BatchScheduler::new(prober, ScanSettings::from_config(config)),
                reconciler: Reconciler::new(hosts),
                events: ProgressBroadcaster::new(config.events.subscriber_capacity),
                state: Mutex::new(RunState::new()),
                phase,
            }),
        }
    }

    /// Uses one store for ranges, hosts and runs.
    pub fn with_store<S>(store: Arc<S>, prober: Arc<dyn Prober>, config: &Config) -> Self
    where
        S: RangeRepository + HostRepository + RunRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store, prober, config)
    }

    /// Starts a run over `range_ids`, or over every configured range when
    /// the list is empty. Returns as soon as the run is accepted.
    pub async fn start_run(&self, range_ids: Vec<RangeId>) -> Result<RunId, RunError> {
        let inner = &self.inner;
        let targets = inner.targets(range_ids).await?;

        let mut total = 0;
        for range in &targets {
            total += inner.scheduler.validate(range)?;
        }

        let (plan, orphan) = inner.reserve(targets, total)?;
        if let Some(lost) = orphan {
            inner.record_abandoned(lost).await;
            inner.announce_abandoned(lost);
        }
        let run_id = plan.run_id;
        let range_ids: Vec<RangeId> = plan.targets.iter().map(|range| range.id.clone()).collect();

        if let Err(e) = inner.runs.record_run(&ScanRun::start(run_id, range_ids.clone())).await {
            error!(run_id = %run_id, "could not record scan run: {e}");
            inner.settle(run_id, Phase::Failed);
            return Err(e.into());
        }

        info!(run_id = %run_id, ranges = range_ids.len(), total, "scan run started");
        inner.events.publish(ScanEvent::RunStarted {
            run_id,
            range_ids,
            total,
        });

        let task = Arc::clone(inner);
        let run = tokio::spawn(async move { task.execute(plan).await });
        let handle = tokio::spawn(Arc::clone(inner).supervise(run_id, run));

        let mut state = inner.lock();
        if let Some(run) = state.run.as_mut() {
            if run.run_id == run_id {
                run.handle = Some(handle);
            }
        }
        Ok(run_id)
    }

    /// Asks the live run to stop after its current batch.
    ///
    /// Returns `false` when nothing is running.
    pub fn stop_run(&self) -> bool {
        let state = self.inner.lock();
        match &state.run {
            Some(run) if state.phase.is_running() => {
                info!(run_id = %run.run_id, "stop requested");
                run.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn get_run_status(&self) -> StatusReport {
        self.inner.lock().report()
    }

    /// Re-resolves the owner of every stored host against the current
    /// ranges. Returns the number of corrected hosts.
    pub async fn repair_all_assignments(&self) -> Result<usize, RunError> {
        let resolver = self.resolver().await?;
        let corrected = self.inner.reconciler.repair_all_assignments(&resolver).await?;
        info!(corrected, "ownership repair finished");
        Ok(corrected)
    }

    /// Resolver over the ranges configured right now.
    pub async fn resolver(&self) -> Result<RangeResolver, RunError> {
        Ok(RangeResolver::new(self.inner.ranges.list_ranges().await?))
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.events.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Resolves once no run is live and returns the phase it settled in.
    pub async fn wait_until_idle(&self) -> Phase {
        let mut rx = self.inner.phase.subscribe();
        match rx.wait_for(|phase| !phase.is_running()).await {
            Ok(phase) => *phase,
            Err(_) => self.get_run_status().state,
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn targets(&self, range_ids: Vec<RangeId>) -> Result<Vec<AddressRange>, RunError> {
        let targets = if range_ids.is_empty() {
            self.ranges.list_ranges().await?
        } else {
            let mut seen = HashSet::new();
            let mut targets = Vec::with_capacity(range_ids.len());
            for id in range_ids {
                if !seen.insert(id.clone()) {
                    continue;
                }
                match self.ranges.get_range(&id).await? {
                    Some(range) => targets.push(range),
                    None => return Err(RunError::UnknownRange(id)),
                }
            }
            targets
        };

        if targets.is_empty() {
            return Err(RunError::NoTargets);
        }
        Ok(targets)
    }

    /// Claims the single run slot. Also returns a previous run that had to
    /// be failed to free it.
    fn reserve(
        &self,
        targets: Vec<AddressRange>,
        total: u64,
    ) -> Result<(RunPlan, Option<RunId>), RunError> {
        let mut state = self.lock();
        let mut orphan = None;
        if state.phase.is_running() {
            let live = state.run.as_ref().map(|run| (run.run_id, run.is_orphaned()));
            match live {
                Some((run_id, true)) => {
                    warn!(run_id = %run_id, "previous run task is gone, marking it failed");
                    state.finish(run_id, Phase::Failed);
                    orphan = Some(run_id);
                }
                Some((run_id, false)) => return Err(RunError::AlreadyRunning { run_id }),
                None => {
                    error!("running without an active run, resetting");
                    state.transition(Phase::Failed);
                }
            }
        }

        let plan = RunPlan {
            run_id: RunId::new(),
            targets,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(ProgressTracker::new(total)),
        };
        state.transition(Phase::Running);
        state.run = Some(ActiveRun {
            run_id: plan.run_id,
            cancel: Arc::clone(&plan.cancel),
            progress: Arc::clone(&plan.progress),
            handle: None,
        });
        self.phase.send_replace(Phase::Running);
        Ok((plan, orphan))
    }

    fn settle(&self, run_id: RunId, to: Phase) -> bool {
        let mut state = self.lock();
        let settled = state.finish(run_id, to);
        if settled {
            self.phase.send_replace(to);
        }
        settled
    }

    /// Waits for the run task. A task that dies without settling fails the
    /// run on its behalf.
    async fn supervise(self: Arc<Self>, run_id: RunId, run: JoinHandle<()>) {
        let Err(e) = run.await else {
            return;
        };
        error!(run_id = %run_id, "scan run task died: {e}");

        self.record_abandoned(run_id).await;
        if self.settle(run_id, Phase::Failed) {
            self.announce_abandoned(run_id);
        }
    }

    async fn record_abandoned(&self, run_id: RunId) {
        let update = RunUpdate::finished(RunStatus::Failed).with_error(ORPHANED_REASON);
        if let Err(e) = self.runs.update_run(run_id, update).await {
            error!(run_id = %run_id, "could not persist abandoned run: {e}");
        }
    }

    fn announce_abandoned(&self, run_id: RunId) {
        self.events.publish(ScanEvent::RunFailed {
            run_id,
            reason: ORPHANED_REASON.to_string(),
        });
    }

    async fn execute(self: Arc<Self>, plan: RunPlan) {
        let run_id = plan.run_id;
        let outcome = self.scan_targets(&plan).await;

        let (phase, update, event) = match outcome {
            Ok(summary) if plan.cancel.load(Ordering::SeqCst) => (
                Phase::Stopped,
                RunUpdate::finished(RunStatus::Stopped).with_summary(summary),
                ScanEvent::RunStopped { run_id },
            ),
            Ok(summary) => (
                Phase::Completed,
                RunUpdate::finished(RunStatus::Completed).with_summary(summary.clone()),
                ScanEvent::RunCompleted { run_id, summary },
            ),
            Err(e) => {
                let reason = e.to_string();
                error!(run_id = %run_id, "scan run failed: {reason}");
                (
                    Phase::Failed,
                    RunUpdate::finished(RunStatus::Failed).with_error(reason.clone()),
                    ScanEvent::RunFailed { run_id, reason },
                )
            }
        };

        if let Err(e) = self.runs.update_run(run_id, update).await {
            error!(run_id = %run_id, "could not persist final run state: {e}");
        }
        self.settle(run_id, phase);
        info!(run_id = %run_id, outcome = %phase, "scan run finished");
        self.events.publish(event);
    }

    async fn scan_targets(&self, plan: &RunPlan) -> Result<RunSummary, RunError> {
        let run_id = plan.run_id;
        let resolver = RangeResolver::new(self.ranges.list_ranges().await?);
        let mut summary = RunSummary::default();
        let mut discovered = HashSet::new();

        for range in &plan.targets {
            if plan.cancel.load(Ordering::SeqCst) {
                break;
            }
            info!(run_id = %run_id, range = %range.id, network = %range.network, "scanning range");

            let ctx = ScanContext {
                run_id,
                progress: &plan.progress,
                cancel: &plan.cancel,
                events: &self.events,
            };
            let scan = self
                .scheduler
                .scan_range(range, &ctx, |found| {
                    self.events.publish(ScanEvent::HostsDiscovered {
                        run_id,
                        range_id: range.id.clone(),
                        addresses: found.iter().map(|obs| obs.address).collect(),
                    });
                })
                .await?;

            for obs in &scan.live {
                if discovered.insert(obs.address) {
                    tally(&mut summary, obs);
                }
            }
            self.reconcile_range(&resolver, range, &scan, &mut summary).await;

            if let Err(e) = self
                .runs
                .update_run(run_id, RunUpdate::discovered(discovered.len() as u64))
                .await
            {
                warn!(run_id = %run_id, "could not update discovered count: {e}");
            }
            if scan.cancelled {
                break;
            }

            let live: HashSet<Ipv4Addr> = scan.live.iter().map(|obs| obs.address).collect();
            match self
                .reconciler
                .mark_unreachable(&resolver, &range.id, &scan.probed, &live)
                .await
            {
                Ok(marked) => summary.offline += marked,
                Err(e) => warn!(range = %range.id, "could not mark silent hosts offline: {e}"),
            }
            self.events.publish(ScanEvent::RangeCompleted {
                run_id,
                range_id: range.id.clone(),
                count: scan.live.len() as u64,
            });
        }

        summary.discovered_count = discovered.len() as u64;
        summary.online = summary.discovered_count;
        Ok(summary)
    }

    /// Writes the live hosts this range owns. Hosts that resolve to another
    /// range wait for that range's scan.
    async fn reconcile_range(
        &self,
        resolver: &RangeResolver,
        range: &AddressRange,
        scan: &RangeScan,
        summary: &mut RunSummary,
    ) {
        for obs in &scan.live {
            match resolver.owner_of(obs.address) {
                None => {
                    warn!(addr = %obs.address, range = %range.id, "live host is outside every configured range");
                    summary.unowned += 1;
                    continue;
                }
                Some(owner) if owner != &range.id => {
                    debug!(addr = %obs.address, owner = %owner, "deferred to owning range");
                    continue;
                }
                Some(_) => {}
            }

            match self.reconciler.reconcile(resolver, obs).await {
                Ok(Reconciled::Created(_) | Reconciled::Updated(_)) => summary.reconciled += 1,
                Ok(Reconciled::Unowned) => summary.unowned += 1,
                Err(e) => {
                    warn!(addr = %obs.address, "failed to reconcile host: {e}");
                    summary.reconcile_failures += 1;
                }
            }
        }
    }
}

fn tally(summary: &mut RunSummary, obs: &HostObservation) {
    let vendor = obs.vendor.clone().unwrap_or_else(|| "unknown".to_string());
    *summary.by_vendor.entry(vendor).or_default() += 1;
    *summary.by_class.entry(obs.device_class()).or_default() += 1;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
