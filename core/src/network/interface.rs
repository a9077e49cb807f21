use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use pnet::util::MacAddr;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    IsLoopback,
    NoMacAddress,
    /// ARP needs a broadcast-capable link.
    NotBroadcast,
}

/// The local link through which a target is directly reachable.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    pub interface: NetworkInterface,
    pub src_mac: MacAddr,
    pub src_addr: Ipv4Addr,
}

/// Finds the interface whose IPv4 network contains `addr`.
pub fn for_target(addr: Ipv4Addr) -> Option<LinkTarget> {
    select_for_target(pnet::datalink::interfaces(), addr)
}

pub fn select_for_target(interfaces: Vec<NetworkInterface>, addr: Ipv4Addr) -> Option<LinkTarget> {
    interfaces
        .into_iter()
        .filter(|interface| is_viable(interface).is_ok())
        .find_map(|interface| {
            let src_addr = interface.ips.iter().find_map(|net| match net {
                IpNetwork::V4(v4) if v4.contains(addr) => Some(v4.ip()),
                _ => None,
            })?;
            let src_mac = interface.mac?;
            Some(LinkTarget {
                interface,
                src_mac,
                src_addr,
            })
        })
}

pub fn is_viable(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    match interface.mac {
        None => return Err(ViabilityError::NoMacAddress),
        Some(mac) if mac == MacAddr::zero() => return Err(ViabilityError::NoMacAddress),
        Some(_) => {}
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
