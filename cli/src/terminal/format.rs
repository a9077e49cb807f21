use chrono::{DateTime, Local, Utc};
use colored::*;
use ipward_common::models::{AddressRange, Host, Liveness, RunSummary};
use pnet::util::MacAddr;

use crate::terminal::colors;
use crate::terminal::print::Detail;

pub fn liveness(liveness: Liveness) -> ColoredString {
    match liveness {
        Liveness::Online => "online".color(colors::ONLINE).bold(),
        Liveness::Offline => "offline".color(colors::OFFLINE),
        Liveness::Unknown => "unknown".color(colors::UNKNOWN),
    }
}

pub fn mac(mac: MacAddr) -> ColoredString {
    mac.to_string().color(colors::MAC_ADDR)
}

pub fn ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<String>>()
        .join(", ")
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn network(range: &AddressRange) -> String {
    format!(
        "{}/{}",
        range.network.network().to_string().color(colors::IPV4_ADDR),
        range.network.prefix().to_string().color(colors::IPV4_PREFIX)
    )
}

pub fn host_details(host: &Host) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("IPv4".to_string(), host.address.to_string().color(colors::IPV4_ADDR)),
        ("State".to_string(), liveness(host.liveness)),
    ];

    if let Some(mac_addr) = host.mac {
        details.push(("MAC".to_string(), mac(mac_addr)));
    }
    if let Some(vendor) = &host.vendor {
        details.push(("Vendor".to_string(), vendor.normal()));
    }
    if !host.open_ports.is_empty() {
        details.push(("Ports".to_string(), ports(&host.open_ports).normal()));
    }
    details.push(("Class".to_string(), host.device_class.to_string().normal()));

    let owner = match &host.range_id {
        Some(id) => id.to_string().color(colors::ACCENT),
        None => "unassigned".dimmed(),
    };
    details.push(("Range".to_string(), owner));

    if let Some(seen) = host.last_seen {
        details.push(("Seen".to_string(), timestamp(seen).normal()));
    }
    details
}

pub fn summary_details(summary: &RunSummary) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("Online".to_string(), summary.online.to_string().color(colors::ONLINE)),
        ("Offline".to_string(), summary.offline.to_string().color(colors::OFFLINE)),
        ("Recorded".to_string(), summary.reconciled.to_string().normal()),
    ];

    if summary.unowned > 0 {
        details.push(("Unowned".to_string(), summary.unowned.to_string().yellow()));
    }
    if summary.reconcile_failures > 0 {
        details.push((
            "Failed".to_string(),
            summary.reconcile_failures.to_string().red(),
        ));
    }
    if !summary.by_class.is_empty() {
        let classes = summary
            .by_class
            .iter()
            .map(|(class, count)| format!("{class} {count}"))
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Classes".to_string(), classes.normal()));
    }
    if !summary.by_vendor.is_empty() {
        let vendors = summary
            .by_vendor
            .iter()
            .map(|(vendor, count)| format!("{vendor} {count}"))
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Vendors".to_string(), vendors.normal()));
    }
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
