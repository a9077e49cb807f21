//! The central **abstraction** for probing a single address.
//!
//! The scheduler and orchestrator depend only on [`Prober`]. The concrete
//! [`NetworkProber`] composes independent backends:
//!
//! * [`liveness`]: primary reachability with retries, then one fallback.
//! * [`hardware`]: chained hardware-address lookups, first hit wins.
//! * [`names`]: reverse (PTR) name resolution.
//!
//! Open ports come from [`crate::network::tcp`] and vendors from a
//! [`VendorRepository`](ipward_common::vendors::VendorRepository).

use std::net::Ipv4Addr;

use async_trait::async_trait;
use ipward_common::models::HostObservation;

pub mod hardware;
pub mod liveness;
pub mod names;
mod pipeline;

pub use pipeline::NetworkProber;

/// Liveness and metadata discovery for one address.
///
/// Implementations never fail: anything that goes wrong while probing is
/// reported as "not alive" or as missing metadata.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: Ipv4Addr) -> HostObservation;
}
