//! # Collaborator Interfaces
//!
//! The discovery core never owns persistence. It talks to three collaborators:
//!
//! * [`RangeRepository`]: read-only view of the configured address ranges.
//! * [`HostRepository`]: host records keyed by IPv4 address.
//! * [`RunRepository`]: scan run history.
//!
//! All writes are single-record operations; there are no transactions that
//! span more than one host.

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::host::Host;
use crate::models::range::{AddressRange, RangeId};
use crate::models::run::{RunId, RunUpdate, ScanRun};

#[async_trait]
pub trait RangeRepository: Send + Sync {
    async fn list_ranges(&self) -> Result<Vec<AddressRange>, StoreError>;

    async fn get_range(&self, id: &RangeId) -> Result<Option<AddressRange>, StoreError>;
}

#[async_trait]
pub trait HostRepository: Send + Sync {
    async fn find_host_by_address(&self, addr: Ipv4Addr) -> Result<Option<Host>, StoreError>;

    /// Inserts or replaces the record with the same address.
    async fn upsert_host(&self, host: Host) -> Result<Host, StoreError>;

    async fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn record_run(&self, run: &ScanRun) -> Result<(), StoreError>;

    async fn update_run(&self, id: RunId, update: RunUpdate) -> Result<(), StoreError>;

    async fn get_run(&self, id: RunId) -> Result<Option<ScanRun>, StoreError>;
}
