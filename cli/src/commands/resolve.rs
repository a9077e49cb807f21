use std::net::Ipv4Addr;

use anyhow::Context;
use colored::*;
use ipward_common::config::Config;
use ipward_core::RangeResolver;
use tracing::warn;

use crate::terminal::{colors, format, print};

pub fn resolve(address: &str, cfg: &Config) -> anyhow::Result<()> {
    let addr: Ipv4Addr = address
        .trim()
        .parse()
        .with_context(|| format!("'{address}' is not an IPv4 address"))?;
    let resolver = RangeResolver::new(cfg.ranges.clone());

    let Some(owner) = resolver.resolve(addr) else {
        warn!("{addr} is outside every configured range");
        return Ok(());
    };

    print::aligned_line("Address", addr.to_string().color(colors::IPV4_ADDR));
    print::aligned_line("Owner", owner.id.to_string().color(colors::ACCENT));
    print::aligned_line("Network", format::network(owner));
    if !owner.gateway.is_unspecified() {
        print::aligned_line("Gateway", owner.gateway.to_string());
    }
    if let Some(description) = &owner.description {
        print::aligned_line("Description", description.as_str());
    }

    let shadowed: Vec<_> = resolver
        .ranges()
        .iter()
        .filter(|range| range.network.contains(addr) && range.id != owner.id)
        .collect();
    if !shadowed.is_empty() {
        print::header("also contained in", 0);
        for (idx, range) in shadowed.into_iter().enumerate() {
            print::tree_head(idx, range.id.as_str());
            print::as_tree_one_level(&[("Network".to_string(), format::network(range).normal())]);
        }
    }
    Ok(())
}
