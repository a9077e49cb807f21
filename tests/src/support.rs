#![cfg(test)]
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ipward_common::config::Config;
use ipward_common::models::{AddressRange, HostObservation, ScanEvent};
use ipward_core::Orchestrator;
use ipward_core::events::Subscription;
use ipward_core::prober::Prober;
use ipward_core::store::MemoryStore;

/// Prober with a fixed answer per address.
pub struct ScriptedProber {
    answers: HashMap<Ipv4Addr, HostObservation>,
    delay: Duration,
    probed: Mutex<Vec<Ipv4Addr>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            delay: Duration::from_millis(5),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(addrs: &[Ipv4Addr]) -> Self {
        addrs
            .iter()
            .fold(Self::new(), |prober, addr| prober.with_host(HostObservation::alive(*addr)))
    }

    pub fn with_host(mut self, obs: HostObservation) -> Self {
        self.answers.insert(obs.address, obs);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probed(&self) -> Vec<Ipv4Addr> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, addr: Ipv4Addr) -> HostObservation {
        tokio::time::sleep(self.delay).await;
        self.probed.lock().unwrap().push(addr);
        self.answers
            .get(&addr)
            .cloned()
            .unwrap_or_else(|| HostObservation::unreachable(addr))
    }
}

pub fn range(id: &str, cidr: &str) -> AddressRange {
    let network = cidr.parse().unwrap();
    AddressRange::new(id, network, Ipv4Addr::UNSPECIFIED)
}

pub fn config(batch_size: usize) -> Config {
    let mut config = Config::default();
    config.scan.batch_size = batch_size;
    config
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub prober: Arc<ScriptedProber>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(ranges: Vec<AddressRange>, prober: ScriptedProber, config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new(ranges));
        let prober = Arc::new(prober);
        let orchestrator = Orchestrator::with_store(store.clone(), prober.clone(), config);
        Self {
            store,
            prober,
            orchestrator,
        }
    }
}

/// Every event of one run, ending with its terminal event.
pub async fn drain_run(sub: &mut Subscription) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Some(event) = sub.recv().await {
        let done = event.is_terminal();
        events.push(event);
        if done {
            break;
        }
    }
    events
}
