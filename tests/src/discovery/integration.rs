#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use ipward_common::config::Config;
use ipward_common::models::{
    DeviceClass, HostObservation, Liveness, Provenance, RangeId, RunStatus, ScanEvent,
};
use ipward_core::Orchestrator;
use ipward_core::orchestrator::Phase;
use ipward_core::prober::NetworkProber;
use ipward_core::store::MemoryStore;
use pnet::util::MacAddr;

use crate::support::{Harness, ScriptedProber, config, drain_run, range};

/// Two /28 ranges with one answering host each.
#[tokio::test(start_paused = true)]
async fn discovery_two_small_ranges() {
    let first = Ipv4Addr::new(192, 168, 1, 5);
    let second = Ipv4Addr::new(192, 168, 2, 9);
    let harness = Harness::new(
        vec![
            range("floor-1", "192.168.1.0/28"),
            range("floor-2", "192.168.2.0/28"),
        ],
        ScriptedProber::answering(&[first, second]),
        &config(4),
    );
    let mut sub = harness.orchestrator.subscribe();

    let run_id = harness
        .orchestrator
        .start_run(vec![RangeId::from("floor-1"), RangeId::from("floor-2")])
        .await
        .unwrap();
    let events = drain_run(&mut sub).await;

    assert!(matches!(
        events.first(),
        Some(ScanEvent::RunStarted { total: 28, .. })
    ));
    let Some(ScanEvent::RunCompleted { summary, .. }) = events.last() else {
        panic!("run did not complete: {:?}", events.last());
    };
    assert_eq!(summary.discovered_count, 2);

    let completed: Vec<(RangeId, u64)> = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::RangeCompleted {
                range_id, count, ..
            } => Some((range_id.clone(), *count)),
            _ => None,
        })
        .collect();
    assert_eq!(
        completed,
        vec![(RangeId::from("floor-1"), 1), (RangeId::from("floor-2"), 1)]
    );

    let run = harness.store.run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.discovered_count, 2);

    let hosts = harness.store.hosts();
    assert_eq!(hosts.len(), 2);
    assert_eq!(
        harness.store.host(first).unwrap().range_id,
        Some(RangeId::from("floor-1"))
    );
    assert_eq!(
        harness.store.host(second).unwrap().range_id,
        Some(RangeId::from("floor-2"))
    );
    assert!(hosts.iter().all(|host| host.provenance == Provenance::Discovery));
    assert!(hosts.iter().all(|host| host.liveness == Liveness::Online));

    let mut probed = harness.prober.probed();
    probed.sort();
    assert_eq!(probed.len(), 28);
    assert!(!probed.contains(&Ipv4Addr::new(192, 168, 1, 0)));
    assert!(!probed.contains(&Ipv4Addr::new(192, 168, 1, 15)));
}

#[tokio::test(start_paused = true)]
async fn enrichment_is_merged_into_existing_hosts() {
    let addr = Ipv4Addr::new(10, 1, 0, 5);
    let mac = MacAddr::new(0x00, 0x1b, 0x21, 0x0a, 0x0b, 0x0c);
    let prober = ScriptedProber::new().with_host(
        HostObservation::alive(addr)
            .with_hostname(Some("printer.lab".into()))
            .with_mac(Some(mac))
            .with_vendor(Some("Intel".into()))
            .with_open_ports(vec![9100, 80]),
    );
    let harness = Harness::new(vec![range("lab", "10.1.0.0/29")], prober, &config(8));

    for _ in 0..2 {
        harness.orchestrator.start_run(Vec::new()).await.unwrap();
        assert_eq!(harness.orchestrator.wait_until_idle().await, Phase::Completed);
    }

    let hosts = harness.store.hosts();
    assert_eq!(hosts.len(), 1);
    let host = &hosts[0];
    assert_eq!(host.hostname.as_deref(), Some("printer.lab"));
    assert_eq!(host.mac, Some(mac));
    assert_eq!(host.open_ports, vec![80, 9100]);
    assert_eq!(host.device_class, DeviceClass::Printer);
}

/// Drives the real prober against loopback.
#[tokio::test]
#[ignore = "touches the host network stack"]
async fn discovery_single_loopback() {
    let mut cfg = Config::default();
    cfg.probe.no_dns = true;
    cfg.probe.timeout_ms = 500;

    let store = Arc::new(MemoryStore::new(vec![range("loopback", "127.0.0.1/32")]));
    let prober = Arc::new(NetworkProber::from_config(&cfg.probe));
    let orchestrator = Orchestrator::with_store(store.clone(), prober, &cfg);

    orchestrator.start_run(Vec::new()).await.unwrap();
    assert_eq!(orchestrator.wait_until_idle().await, Phase::Completed);

    let host = store
        .host(Ipv4Addr::LOCALHOST)
        .expect("loopback did not answer");
    assert_eq!(host.range_id, Some(RangeId::from("loopback")));
}
