//! # Range Resolver
//!
//! Maps an IPv4 address to the configured range that owns it.
//!
//! Ranges may overlap in configuration. The owner is the containing range
//! with the longest prefix; equal prefixes fall back to the canonical network
//! string and then the range id, so every address has at most one owner and
//! the answer does not depend on configuration order.

use std::cmp::Reverse;
use std::net::Ipv4Addr;

use ipward_common::models::{AddressRange, RangeId};

/// Immutable snapshot of the configured ranges, pre-sorted for lookup.
#[derive(Debug, Clone, Default)]
pub struct RangeResolver {
    ranges: Vec<AddressRange>,
}

impl RangeResolver {
    pub fn new(mut ranges: Vec<AddressRange>) -> Self {
        ranges.sort_by_cached_key(|range| {
            (
                Reverse(range.network.prefix()),
                range.network.to_string(),
                range.id.clone(),
            )
        });
        Self { ranges }
    }

    /// Most specific range containing `addr`, if any.
    pub fn resolve(&self, addr: Ipv4Addr) -> Option<&AddressRange> {
        self.ranges.iter().find(|range| range.network.contains(addr))
    }

    /// Like [`resolve`](Self::resolve) for textual input. Anything that is
    /// not a dotted-quad IPv4 address has no owner.
    pub fn resolve_str(&self, addr: &str) -> Option<&AddressRange> {
        addr.trim()
            .parse::<Ipv4Addr>()
            .ok()
            .and_then(|addr| self.resolve(addr))
    }

    pub fn owner_of(&self, addr: Ipv4Addr) -> Option<&RangeId> {
        self.resolve(addr).map(|range| &range.id)
    }

    pub fn get(&self, id: &RangeId) -> Option<&AddressRange> {
        self.ranges.iter().find(|range| &range.id == id)
    }

    /// Ranges in resolution order.
    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
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
