//! # Reconciliation Engine
//!
//! Writes observations into the host store. The [`RangeResolver`] is the
//! only authority on which range owns an address: a host is never created
//! for an address no range owns, and the range that happened to be scanned
//! is never used as a stand-in owner.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use ipward_common::error::StoreError;
use ipward_common::models::{Host, HostObservation, Liveness, RangeId};
use ipward_common::store::HostRepository;
use tracing::{debug, info, warn};

use crate::resolver::RangeResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Created(Host),
    Updated(Host),
    /// No configured range owns the address; nothing was written.
    Unowned,
}

pub struct Reconciler {
    hosts: Arc<dyn HostRepository>,
}

impl Reconciler {
    pub fn new(hosts: Arc<dyn HostRepository>) -> Self {
        Self { hosts }
    }

    /// Merges a live observation into the store.
    ///
    /// Existing hosts keep their owner; repair is a separate pass.
    pub async fn reconcile(
        &self,
        resolver: &RangeResolver,
        obs: &HostObservation,
    ) -> Result<Reconciled, StoreError> {
        let now = Utc::now();

        if let Some(mut host) = self.hosts.find_host_by_address(obs.address).await? {
            host.merge(obs, now);
            let host = self.hosts.upsert_host(host).await?;
            return Ok(Reconciled::Updated(host));
        }

        match resolver.resolve(obs.address) {
            Some(range) => {
                let host = Host::discovered(obs, range.id.clone(), now);
                let host = self.hosts.upsert_host(host).await?;
                debug!(addr = %obs.address, range = %range.id, "created host");
                Ok(Reconciled::Created(host))
            }
            None => {
                warn!(addr = %obs.address, "no configured range owns this address, host not recorded");
                Ok(Reconciled::Unowned)
            }
        }
    }

    /// Re-resolves the owner of every stored host and fixes stale ones.
    ///
    /// Returns the number of corrected hosts. Hosts that no range owns any
    /// more lose their owner but stay stored. A second pass over unchanged
    /// data corrects nothing.
    pub async fn repair_all_assignments(&self, resolver: &RangeResolver) -> Result<usize, StoreError> {
        let mut corrected = 0;
        for mut host in self.hosts.list_all_hosts().await? {
            let owner = resolver.owner_of(host.address);
            if host.range_id.as_ref() == owner {
                continue;
            }
            if owner.is_none() {
                warn!(addr = %host.address, "host is outside every configured range, clearing its owner");
            }

            let previous = std::mem::replace(&mut host.range_id, owner.cloned());
            match self.hosts.upsert_host(host.clone()).await {
                Ok(_) => {
                    info!(
                        addr = %host.address,
                        from = ?previous.as_ref().map(RangeId::as_str),
                        to = ?owner.map(RangeId::as_str),
                        "reassigned host"
                    );
                    corrected += 1;
                }
                Err(e) => warn!(addr = %host.address, "failed to reassign host: {e}"),
            }
        }
        Ok(corrected)
    }

    /// Marks hosts owned by `range_id` that were probed but did not answer
    /// as offline. Hosts are never deleted. Returns how many changed.
    pub async fn mark_unreachable(
        &self,
        resolver: &RangeResolver,
        range_id: &RangeId,
        probed: &[Ipv4Addr],
        live: &HashSet<Ipv4Addr>,
    ) -> Result<u64, StoreError> {
        let probed: HashSet<Ipv4Addr> = probed.iter().copied().collect();
        let mut marked = 0;

        for mut host in self.hosts.list_all_hosts().await? {
            let silent = probed.contains(&host.address) && !live.contains(&host.address);
            let owned = resolver.owner_of(host.address) == Some(range_id);
            if !silent || !owned || host.liveness == Liveness::Offline {
                continue;
            }
            host.liveness = Liveness::Offline;
            match self.hosts.upsert_host(host.clone()).await {
                Ok(_) => marked += 1,
                Err(e) => warn!(addr = %host.address, "failed to mark host offline: {e}"),
            }
        }
        Ok(marked)
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
