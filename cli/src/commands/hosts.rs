use std::path::Path;

use colored::*;
use ipward_common::config::Config;
use ipward_common::models::{Host, Liveness, RangeId};
use ipward_common::store::HostRepository;
use ipward_core::store::JsonFileStore;
use tracing::info;

use crate::mprint;
use crate::terminal::{format, print};

pub async fn hosts(range: Option<String>, cfg: &Config, store_path: &Path, quiet: u8) -> anyhow::Result<()> {
    let store = JsonFileStore::open(store_path, cfg.ranges.clone()).await?;
    let filter: Option<RangeId> = range.map(RangeId::from);

    let hosts: Vec<Host> = store
        .list_all_hosts()
        .await?
        .into_iter()
        .filter(|host| filter.is_none() || host.range_id == filter)
        .collect();

    if hosts.is_empty() {
        print::nothing_found("hosts");
        return Ok(());
    }

    print::header("stored hosts", quiet);
    if quiet == 0 {
        for (idx, host) in hosts.iter().enumerate() {
            let name = host.hostname.as_deref().unwrap_or("No hostname");
            print::tree_head(idx, name);
            print::as_tree_one_level(&format::host_details(host));
            if idx + 1 != hosts.len() {
                mprint!();
            }
        }
        print::fat_separator();
    }

    let online = hosts
        .iter()
        .filter(|host| host.liveness == Liveness::Online)
        .count();
    info!(
        "{} host(s), {} online, {} offline",
        hosts.len().to_string().bold(),
        online.to_string().green(),
        (hosts.len() - online).to_string().red()
    );
    Ok(())
}
