use std::path::Path;
use std::sync::Arc;

use colored::*;
use ipward_common::config::Config;
use ipward_core::RangeResolver;
use ipward_core::reconcile::Reconciler;
use ipward_core::store::JsonFileStore;
use tracing::info;

pub async fn repair(cfg: &Config, store_path: &Path) -> anyhow::Result<()> {
    let store = Arc::new(JsonFileStore::open(store_path, cfg.ranges.clone()).await?);
    let resolver = RangeResolver::new(cfg.ranges.clone());

    let corrected = Reconciler::new(store)
        .repair_all_assignments(&resolver)
        .await?;

    match corrected {
        0 => info!("every stored host already has its most specific owner"),
        n => info!("reassigned {} host(s)", n.to_string().green().bold()),
    }
    Ok(())
}
