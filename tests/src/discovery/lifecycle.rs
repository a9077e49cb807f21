#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipward_common::error::StoreError;
use ipward_common::models::{AddressRange, RangeId, RunStatus, ScanEvent};
use ipward_common::store::RangeRepository;
use ipward_core::orchestrator::Phase;
use ipward_core::store::MemoryStore;
use ipward_core::{Orchestrator, RunError};
use tokio::time::Instant;

use crate::support::{Harness, ScriptedProber, config, drain_run, range};

fn whole_subnet_alive() -> ScriptedProber {
    let alive: Vec<Ipv4Addr> = (1..=254).map(|last| Ipv4Addr::new(10, 9, 0, last)).collect();
    ScriptedProber::answering(&alive).with_delay(Duration::from_millis(50))
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_bounded() {
    let harness = Harness::new(
        vec![range("a", "10.9.0.0/27"), range("b", "10.9.1.0/28")],
        ScriptedProber::new(),
        &config(8),
    );
    let mut sub = harness.orchestrator.subscribe();
    harness.orchestrator.start_run(Vec::new()).await.unwrap();
    let events = drain_run(&mut sub).await;

    let Some(ScanEvent::RunStarted { total, .. }) = events.first() else {
        panic!("first event must announce the run");
    };
    assert_eq!(*total, 30 + 14);

    let mut last = 0;
    let mut updates = 0;
    for event in &events {
        if let ScanEvent::ProgressUpdated { progress, .. } = event {
            assert_eq!(progress.total, *total);
            assert!(progress.current >= last);
            assert!(progress.current <= progress.total);
            last = progress.current;
            updates += 1;
        }
    }
    assert_eq!(last, *total);
    assert_eq!(updates, 4 + 2);
}

#[tokio::test(start_paused = true)]
async fn stop_lands_within_one_batch_and_silences_discovery() {
    let harness = Harness::new(
        vec![range("busy", "10.9.0.0/24")],
        whole_subnet_alive(),
        &config(8),
    );
    let mut sub = harness.orchestrator.subscribe();
    let run_id = harness.orchestrator.start_run(Vec::new()).await.unwrap();

    // second batch is in flight at this point
    tokio::time::sleep(Duration::from_millis(170)).await;
    let asked = Instant::now();
    assert!(harness.orchestrator.stop_run());
    assert_eq!(harness.orchestrator.wait_until_idle().await, Phase::Stopped);
    assert!(asked.elapsed() <= Duration::from_millis(50));

    let events = drain_run(&mut sub).await;
    assert_eq!(events.last(), Some(&ScanEvent::RunStopped { run_id }));
    let discovered: usize = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::HostsDiscovered { addresses, .. } => Some(addresses.len()),
            _ => None,
        })
        .sum();
    assert_eq!(discovered, 16);
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, ScanEvent::RangeCompleted { .. }))
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sub.try_recv(), None);

    let run = harness.store.run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Stopped);
    assert_eq!(run.discovered_count, 16);
    assert_eq!(harness.store.hosts().len(), 16);
}

#[tokio::test(start_paused = true)]
async fn concurrent_start_is_rejected() {
    let harness = Harness::new(
        vec![range("busy", "10.9.0.0/24")],
        whole_subnet_alive(),
        &config(32),
    );
    let running = harness.orchestrator.start_run(Vec::new()).await.unwrap();

    let second = harness.orchestrator.clone();
    let attempt = tokio::spawn(async move { second.start_run(Vec::new()).await });
    match attempt.await.unwrap() {
        Err(RunError::AlreadyRunning { run_id }) => assert_eq!(run_id, running),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    let status = harness.orchestrator.get_run_status();
    assert!(status.active);
    assert_eq!(status.run_id, Some(running));

    harness.orchestrator.stop_run();
    harness.orchestrator.wait_until_idle().await;
}

/// Range listing that works for lookups but fails once the run needs the
/// full set.
struct BrokenListing {
    inner: MemoryStore,
}

#[async_trait]
impl RangeRepository for BrokenListing {
    async fn list_ranges(&self) -> Result<Vec<AddressRange>, StoreError> {
        Err(StoreError::Backend("range service unavailable".into()))
    }

    async fn get_range(&self, id: &RangeId) -> Result<Option<AddressRange>, StoreError> {
        self.inner.get_range(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn orchestration_errors_fail_the_run() {
    let store = Arc::new(MemoryStore::default());
    let ranges = Arc::new(BrokenListing {
        inner: MemoryStore::new(vec![range("lab", "10.9.0.0/28")]),
    });
    let orchestrator = Orchestrator::new(
        ranges,
        store.clone(),
        store.clone(),
        Arc::new(ScriptedProber::new()),
        &config(8),
    );
    let mut sub = orchestrator.subscribe();

    let run_id = orchestrator
        .start_run(vec![RangeId::from("lab")])
        .await
        .unwrap();
    let events = drain_run(&mut sub).await;

    let Some(ScanEvent::RunFailed { reason, .. }) = events.last() else {
        panic!("expected a failed run, got {:?}", events.last());
    };
    assert!(reason.contains("range service unavailable"));

    let status = orchestrator.get_run_status();
    assert!(!status.active);
    assert_eq!(status.state, Phase::Failed);
    assert_eq!(status.run_id, Some(run_id));

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.unwrap().contains("range service unavailable"));

    // no automatic retry, but a new run may start
    assert!(matches!(
        orchestrator.start_run(vec![RangeId::from("lab")]).await,
        Ok(id) if id != run_id
    ));
    orchestrator.wait_until_idle().await;
}

#[tokio::test(start_paused = true)]
async fn slow_subscriber_never_stalls_a_run() {
    let mut cfg = config(8);
    cfg.events.subscriber_capacity = 1;
    let harness = Harness::new(
        vec![range("lab", "10.9.0.0/26")],
        ScriptedProber::new().with_delay(Duration::ZERO),
        &cfg,
    );
    let mut ignored = harness.orchestrator.subscribe();

    harness.orchestrator.start_run(Vec::new()).await.unwrap();
    assert_eq!(harness.orchestrator.wait_until_idle().await, Phase::Completed);

    assert!(matches!(ignored.recv().await, Some(ScanEvent::RunStarted { .. })));
    assert_eq!(ignored.recv().await, None);
}
