use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::network::Cidr;

/// Identifier of an address range, assigned by the range-management side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeId(String);

impl RangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RangeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RangeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A configured block of addresses (subnet / VLAN) that may own hosts.
///
/// Configured ranges are allowed to overlap; ownership is decided by the
/// range resolver, never by which range happened to be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub id: RangeId,
    pub network: Cidr,
    pub gateway: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AddressRange {
    pub fn new(id: impl Into<RangeId>, network: Cidr, gateway: Ipv4Addr) -> Self {
        Self {
            id: id.into(),
            network,
            gateway,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.network)
    }
}
