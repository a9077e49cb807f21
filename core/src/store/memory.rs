use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use ipward_common::error::StoreError;
use ipward_common::models::{AddressRange, Host, RangeId, RunId, RunUpdate, ScanRun};
use ipward_common::store::{HostRepository, RangeRepository, RunRepository};

#[derive(Debug, Default)]
pub struct MemoryStore {
    ranges: RwLock<Vec<AddressRange>>,
    hosts: RwLock<BTreeMap<Ipv4Addr, Host>>,
    runs: RwLock<HashMap<RunId, ScanRun>>,
}

impl MemoryStore {
    pub fn new(ranges: Vec<AddressRange>) -> Self {
        Self {
            ranges: RwLock::new(ranges),
            ..Self::default()
        }
    }

    /// Replaces the configured ranges, as the range-management side would.
    pub fn set_ranges(&self, ranges: Vec<AddressRange>) {
        *write(&self.ranges) = ranges;
    }

    pub fn insert_host(&self, host: Host) {
        write(&self.hosts).insert(host.address, host);
    }

    pub fn host(&self, addr: Ipv4Addr) -> Option<Host> {
        read(&self.hosts).get(&addr).cloned()
    }

    pub fn hosts(&self) -> Vec<Host> {
        read(&self.hosts).values().cloned().collect()
    }

    pub fn run(&self, id: RunId) -> Option<ScanRun> {
        read(&self.runs).get(&id).cloned()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RangeRepository for MemoryStore {
    async fn list_ranges(&self) -> Result<Vec<AddressRange>, StoreError> {
        Ok(read(&self.ranges).clone())
    }

    async fn get_range(&self, id: &RangeId) -> Result<Option<AddressRange>, StoreError> {
        Ok(read(&self.ranges).iter().find(|range| &range.id == id).cloned())
    }
}

#[async_trait]
impl HostRepository for MemoryStore {
    async fn find_host_by_address(&self, addr: Ipv4Addr) -> Result<Option<Host>, StoreError> {
        Ok(self.host(addr))
    }

    async fn upsert_host(&self, host: Host) -> Result<Host, StoreError> {
        write(&self.hosts).insert(host.address, host.clone());
        Ok(host)
    }

    async fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError> {
        Ok(self.hosts())
    }
}

#[async_trait]
impl RunRepository for MemoryStore {
    async fn record_run(&self, run: &ScanRun) -> Result<(), StoreError> {
        write(&self.runs).insert(run.id, run.clone());
        Ok(())
    }

    async fn update_run(&self, id: RunId, update: RunUpdate) -> Result<(), StoreError> {
        let mut runs = write(&self.runs);
        let run = runs.get_mut(&id).ok_or(StoreError::RunNotFound(id))?;
        update.apply(run);
        Ok(())
    }

    async fn get_run(&self, id: RunId) -> Result<Option<ScanRun>, StoreError> {
        Ok(self.run(id))
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
