#![cfg(test)]
use std::net::Ipv4Addr;

use chrono::Utc;
use ipward_common::models::{Host, HostObservation, RangeId, ScanEvent};
use ipward_core::orchestrator::Phase;

use crate::support::{Harness, ScriptedProber, config, drain_run, range};

const INSIDE_NARROW: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 200);
const INSIDE_WIDE: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 20);

fn overlapping() -> Harness {
    Harness::new(
        vec![
            range("wide", "10.0.1.0/24"),
            range("narrow", "10.0.1.128/25"),
        ],
        ScriptedProber::answering(&[INSIDE_NARROW, INSIDE_WIDE]),
        &config(64),
    )
}

#[tokio::test(start_paused = true)]
async fn longest_prefix_owns_overlapping_addresses() {
    let harness = overlapping();
    harness.orchestrator.start_run(Vec::new()).await.unwrap();
    assert_eq!(harness.orchestrator.wait_until_idle().await, Phase::Completed);

    assert_eq!(
        harness.store.host(INSIDE_NARROW).unwrap().range_id,
        Some(RangeId::from("narrow"))
    );
    assert_eq!(
        harness.store.host(INSIDE_WIDE).unwrap().range_id,
        Some(RangeId::from("wide"))
    );

    let resolver = harness.orchestrator.resolver().await.unwrap();
    assert_eq!(resolver.owner_of(INSIDE_NARROW), Some(&RangeId::from("narrow")));
}

#[tokio::test(start_paused = true)]
async fn scanned_range_is_never_a_fallback_owner() {
    let harness = overlapping();
    let mut sub = harness.orchestrator.subscribe();

    harness
        .orchestrator
        .start_run(vec![RangeId::from("wide")])
        .await
        .unwrap();
    let events = drain_run(&mut sub).await;

    // both answered while scanning the wide range
    let announced: Vec<Ipv4Addr> = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::HostsDiscovered { addresses, .. } => Some(addresses.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(announced, vec![INSIDE_WIDE, INSIDE_NARROW]);

    // only the one the wide range owns was written
    assert!(harness.store.host(INSIDE_WIDE).is_some());
    assert!(harness.store.host(INSIDE_NARROW).is_none());

    harness
        .orchestrator
        .start_run(vec![RangeId::from("narrow")])
        .await
        .unwrap();
    harness.orchestrator.wait_until_idle().await;
    assert_eq!(
        harness.store.host(INSIDE_NARROW).unwrap().range_id,
        Some(RangeId::from("narrow"))
    );
}

#[tokio::test(start_paused = true)]
async fn unowned_addresses_never_become_hosts() {
    let stray = Ipv4Addr::new(10, 0, 2, 9);
    let harness = Harness::new(
        vec![range("lab", "10.0.2.0/28")],
        ScriptedProber::answering(&[stray]),
        &config(16),
    );
    let mut sub = harness.orchestrator.subscribe();

    // the range store moves on while the run is underway
    harness.orchestrator.start_run(Vec::new()).await.unwrap();
    harness.store.set_ranges(Vec::new());
    let events = drain_run(&mut sub).await;

    let Some(ScanEvent::RunCompleted { summary, .. }) = events.last() else {
        panic!("run did not complete: {:?}", events.last());
    };
    assert_eq!(summary.discovered_count, 1);
    assert_eq!(summary.unowned, 1);
    assert_eq!(summary.reconciled, 0);
    assert!(harness.store.hosts().is_empty());
}

#[tokio::test]
async fn repair_converges_after_ranges_change() {
    let harness = overlapping();
    let now = Utc::now();
    for addr in [INSIDE_NARROW, INSIDE_WIDE] {
        harness.store.insert_host(Host::discovered(
            &HostObservation::alive(addr),
            RangeId::from("wide"),
            now,
        ));
    }

    assert_eq!(harness.orchestrator.repair_all_assignments().await.unwrap(), 1);
    assert_eq!(harness.orchestrator.repair_all_assignments().await.unwrap(), 0);
    assert_eq!(
        harness.store.host(INSIDE_NARROW).unwrap().range_id,
        Some(RangeId::from("narrow"))
    );

    harness.store.set_ranges(vec![range("wide", "10.0.1.0/24")]);
    assert_eq!(harness.orchestrator.repair_all_assignments().await.unwrap(), 1);
    assert_eq!(harness.orchestrator.repair_all_assignments().await.unwrap(), 0);
    assert_eq!(
        harness.store.host(INSIDE_NARROW).unwrap().range_id,
        Some(RangeId::from("wide"))
    );
}
