//! # CIDR blocks
//!
//! A [`Cidr`] wraps a [`pnet::ipnetwork::Ipv4Network`] that is always stored
//! masked, so `10.0.1.77/24` and `10.0.1.0/24` are the same value and print
//! the same canonical string.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::network::range::Ipv4Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Ipv4Network", into = "Ipv4Network")]
pub struct Cidr(Ipv4Network);

impl Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, RangeError> {
        let network = Ipv4Network::new(addr, prefix).map_err(|_| RangeError::InvalidPrefix(prefix))?;
        Ok(Self::masked(network))
    }

    fn masked(network: Ipv4Network) -> Self {
        // prefix was already accepted once
        Self(Ipv4Network::new(network.network(), network.prefix()).unwrap_or(network))
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.0.contains(addr)
    }

    /// Total addresses in the block, network and broadcast included.
    pub fn size(&self) -> u64 {
        // Ipv4Network::size overflows its u32 for /0
        match self.prefix() {
            0 => u64::from(u32::MAX) + 1,
            _ => u64::from(self.0.size()),
        }
    }

    /// Host addresses worth probing.
    ///
    /// Network and broadcast addresses are excluded, except for /31 and /32
    /// blocks which have neither.
    pub fn usable_range(&self) -> Ipv4Range {
        let (network, broadcast) = (self.network(), self.broadcast());
        if self.prefix() >= 31 {
            return Ipv4Range::new(network, broadcast);
        }
        let start = u32::from(network).saturating_add(1);
        let end = u32::from(broadcast).saturating_sub(1);
        Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end))
    }

    pub fn usable_count(&self) -> u64 {
        self.usable_range().len()
    }

    pub fn is_usable(&self, addr: Ipv4Addr) -> bool {
        self.usable_range().contains(addr)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix())
    }
}

impl FromStr for Cidr {
    type Err = RangeError;

    /// Parses `a.b.c.d/p` or `a.b.c.d/m.m.m.m`. A bare address is read as a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<Ipv4Network>()
            .map(Self::masked)
            .map_err(|_| RangeError::InvalidCidr(s.to_string()))
    }
}

impl From<Ipv4Network> for Cidr {
    fn from(network: Ipv4Network) -> Self {
        Self::masked(network)
    }
}

impl From<Cidr> for Ipv4Network {
    fn from(value: Cidr) -> Self {
        value.0
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
