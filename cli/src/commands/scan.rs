use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use colored::*;
use ipward_common::config::Config;
use ipward_common::models::{Host, RangeId, RunId, RunSummary, ScanEvent};
use ipward_common::store::HostRepository;
use ipward_core::Orchestrator;
use ipward_core::events::Subscription;
use ipward_core::prober::NetworkProber;
use ipward_core::store::JsonFileStore;
use tracing::{debug, error, info, warn};

use crate::mprint;
use crate::terminal::{colors, format, print, progress::RunProgress};

pub async fn scan(
    ranges: Vec<String>,
    json: bool,
    cfg: &Config,
    store_path: &Path,
    quiet: u8,
) -> anyhow::Result<()> {
    if !is_root::is_root() {
        warn!("not running as root, falling back to TCP reachability and the neighbour table");
    }

    let store = Arc::new(JsonFileStore::open(store_path, cfg.ranges.clone()).await?);
    let prober = Arc::new(NetworkProber::from_config(&cfg.probe));
    let orchestrator = Orchestrator::with_store(store.clone(), prober, cfg);

    let mut events = orchestrator.subscribe();
    let start_time: Instant = Instant::now();
    let run_id = orchestrator
        .start_run(ranges.into_iter().map(RangeId::from).collect())
        .await?;
    debug!(run_id = %run_id, "run accepted");

    let stopper = orchestrator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && stopper.stop_run() {
            warn!("stopping after the current batch");
        }
    });

    let (outcome, found) = if json {
        (stream_json(&mut events).await?, Vec::new())
    } else {
        follow(&mut events).await
    };

    match outcome {
        Some(ScanEvent::RunCompleted { summary, .. }) => {
            if !json {
                print_hosts(store.as_ref(), &found, quiet).await;
                print_summary(run_id, &summary, start_time.elapsed(), quiet);
            }
            Ok(())
        }
        Some(ScanEvent::RunStopped { .. }) => {
            warn!("scan {run_id} was stopped before every range was probed");
            Ok(())
        }
        Some(ScanEvent::RunFailed { reason, .. }) => bail!("scan {run_id} failed: {reason}"),
        _ => {
            let phase = orchestrator.wait_until_idle().await;
            warn!("event stream ended early, scan {run_id} finished as {phase}");
            Ok(())
        }
    }
}

/// Renders events until the terminal one, which is returned together with
/// every announced address.
async fn follow(events: &mut Subscription) -> (Option<ScanEvent>, Vec<Ipv4Addr>) {
    let mut bar: Option<RunProgress> = None;
    let mut found: Vec<Ipv4Addr> = Vec::new();

    while let Some(event) = events.recv().await {
        match &event {
            ScanEvent::RunStarted {
                range_ids, total, ..
            } => {
                info!(
                    "probing {} addresses across {} range(s)",
                    total.to_string().bold(),
                    range_ids.len()
                );
                bar = Some(RunProgress::start(*total));
            }
            ScanEvent::ProgressUpdated { progress, .. } => {
                if let Some(bar) = &bar {
                    bar.update(progress);
                }
            }
            ScanEvent::HostsDiscovered {
                range_id,
                addresses,
                ..
            } => {
                for addr in addresses {
                    debug!("{} is up in {}", addr.to_string().color(colors::IPV4_ADDR), range_id);
                }
                found.extend_from_slice(addresses);
                if let Some(bar) = &mut bar {
                    bar.hosts_found(addresses.len());
                }
            }
            ScanEvent::RangeCompleted {
                range_id, count, ..
            } => {
                info!("{} finished with {} live host(s)", range_id.to_string().color(colors::ACCENT), count);
            }
            ScanEvent::RunFailed { reason, .. } => {
                error!("{reason}");
            }
            ScanEvent::RunCompleted { .. } | ScanEvent::RunStopped { .. } => {}
        }

        if event.is_terminal() {
            drop(bar);
            found.sort();
            found.dedup();
            return (Some(event), found);
        }
    }
    (None, found)
}

async fn stream_json(events: &mut Subscription) -> anyhow::Result<Option<ScanEvent>> {
    while let Some(event) = events.recv().await {
        print::print(&serde_json::to_string(&event)?);
        if event.is_terminal() {
            return Ok(Some(event));
        }
    }
    Ok(None)
}

async fn print_hosts(store: &JsonFileStore, found: &[Ipv4Addr], quiet: u8) {
    if quiet > 1 {
        return;
    }
    if found.is_empty() {
        print::nothing_found("live hosts");
        return;
    }

    let mut hosts: Vec<Host> = Vec::with_capacity(found.len());
    for addr in found {
        match store.find_host_by_address(*addr).await {
            Ok(Some(host)) => hosts.push(host),
            Ok(None) => debug!(addr = %addr, "live host was not recorded"),
            Err(e) => warn!(addr = %addr, "could not read host back: {e}"),
        }
    }

    print::header("network discovery", quiet);
    for (idx, host) in hosts.iter().enumerate() {
        print::tree_head(idx, host.hostname.as_deref().unwrap_or("No hostname"));
        print::as_tree_one_level(&format::host_details(host));
        if idx + 1 != hosts.len() {
            mprint!();
        }
    }
}

fn print_summary(run_id: RunId, summary: &RunSummary, total_time: Duration, quiet: u8) {
    let hosts: ColoredString = format!("{} live hosts", summary.discovered_count)
        .bold()
        .green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Discovery Complete: {hosts} identified in {total_time}");

    if quiet > 0 {
        info!("{output}");
        return;
    }

    print::header("run summary", quiet);
    print::aligned_line("Run", run_id.to_string());
    print::as_tree_one_level(&format::summary_details(summary));
    mprint!();
    print::fat_separator();
    print::centerln(&output);
}
