use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use pnet::util::MacAddr;
use serde::{Deserialize, Serialize};

use crate::models::range::RangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Online,
    Offline,
    #[default]
    Unknown,
}

/// Who or what created a host record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Discovery,
    Manual,
    Import,
}

/// Coarse device classification derived from the open port list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Router,
    Printer,
    WindowsHost,
    Server,
    Workstation,
    #[default]
    Unknown,
}

const PRINTER_PORTS: [u16; 3] = [515, 631, 9100];
const WEB_PORTS: [u16; 3] = [80, 443, 8080];

impl DeviceClass {
    /// First matching rule wins: printer ports, then DNS plus a web UI
    /// (router), then RDP or SMB (Windows), then SSH with a service port
    /// (server), then SSH alone (workstation).
    pub fn infer(open_ports: &[u16]) -> Self {
        let has = |port: u16| open_ports.contains(&port);
        let any = |ports: &[u16]| ports.iter().any(|port| has(*port));

        if any(&PRINTER_PORTS) {
            DeviceClass::Printer
        } else if has(53) && any(&WEB_PORTS) {
            DeviceClass::Router
        } else if has(3389) || has(445) {
            DeviceClass::WindowsHost
        } else if has(22) && (any(&WEB_PORTS) || has(25) || has(21)) {
            DeviceClass::Server
        } else if has(22) {
            DeviceClass::Workstation
        } else {
            DeviceClass::Unknown
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Router => "router",
            DeviceClass::Printer => "printer",
            DeviceClass::WindowsHost => "windows host",
            DeviceClass::Server => "server",
            DeviceClass::Workstation => "workstation",
            DeviceClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Result of probing a single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostObservation {
    pub address: Ipv4Addr,
    pub alive: bool,
    pub hostname: Option<String>,
    pub mac: Option<MacAddr>,
    pub vendor: Option<String>,
    pub open_ports: Vec<u16>,
    pub observed_at: DateTime<Utc>,
}

impl HostObservation {
    pub fn unreachable(address: Ipv4Addr) -> Self {
        Self {
            address,
            alive: false,
            hostname: None,
            mac: None,
            vendor: None,
            open_ports: Vec::new(),
            observed_at: Utc::now(),
        }
    }

    pub fn alive(address: Ipv4Addr) -> Self {
        Self {
            alive: true,
            ..Self::unreachable(address)
        }
    }

    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        self.hostname = hostname.filter(|name| !name.trim().is_empty());
        self
    }

    pub fn with_mac(mut self, mac: Option<MacAddr>) -> Self {
        self.mac = mac;
        self
    }

    pub fn with_vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor.filter(|vendor| !vendor.trim().is_empty());
        self
    }

    pub fn with_open_ports(mut self, mut ports: Vec<u16>) -> Self {
        ports.sort_unstable();
        ports.dedup();
        self.open_ports = ports;
        self
    }

    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::infer(&self.open_ports)
    }
}

/// Persisted host record, unique by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub address: Ipv4Addr,
    pub hostname: Option<String>,
    pub mac: Option<MacAddr>,
    pub vendor: Option<String>,
    #[serde(default)]
    pub open_ports: Vec<u16>,
    #[serde(default)]
    pub device_class: DeviceClass,
    #[serde(default)]
    pub liveness: Liveness,
    pub last_seen: Option<DateTime<Utc>>,
    pub range_id: Option<RangeId>,
    pub provenance: Provenance,
}

impl Host {
    /// A fresh record created from a live observation.
    pub fn discovered(obs: &HostObservation, owner: RangeId, now: DateTime<Utc>) -> Self {
        Self {
            address: obs.address,
            hostname: obs.hostname.clone(),
            mac: obs.mac,
            vendor: obs.vendor.clone(),
            open_ports: obs.open_ports.clone(),
            device_class: obs.device_class(),
            liveness: Liveness::Online,
            last_seen: Some(now),
            range_id: Some(owner),
            provenance: Provenance::Discovery,
        }
    }

    /// Folds a live observation into the record.
    ///
    /// Only non-empty observed attributes overwrite stored ones. The owning
    /// range is never touched here.
    pub fn merge(&mut self, obs: &HostObservation, now: DateTime<Utc>) {
        if let Some(hostname) = obs.hostname.as_ref().filter(|name| !name.is_empty()) {
            self.hostname = Some(hostname.clone());
        }
        if let Some(mac) = obs.mac {
            self.mac = Some(mac);
        }
        if let Some(vendor) = obs.vendor.as_ref().filter(|vendor| !vendor.is_empty()) {
            self.vendor = Some(vendor.clone());
        }
        if !obs.open_ports.is_empty() {
            self.open_ports = obs.open_ports.clone();
            self.device_class = obs.device_class();
        }
        self.liveness = Liveness::Online;
        self.last_seen = Some(now);
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
