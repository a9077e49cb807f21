use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ipward_common::error::StoreError;
use ipward_common::models::{AddressRange, Host, RangeId, RunId, RunUpdate, ScanRun};
use ipward_common::store::{HostRepository, RangeRepository, RunRepository};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    hosts: Vec<Host>,
    #[serde(default)]
    runs: Vec<ScanRun>,
}

/// Hosts and runs kept in a single JSON file.
///
/// Every write rewrites the whole document to a sibling temp file and
/// renames it over the original, so readers never see a torn file.
pub struct JsonFileStore {
    path: PathBuf,
    ranges: Vec<AddressRange>,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>, ranges: Vec<AddressRange>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file missing, starting empty");
                Document::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            ranges,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the document and keeps the copy only
    /// once it is on disk.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Document) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *doc = next;
        Ok(out)
    }

    async fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RangeRepository for JsonFileStore {
    async fn list_ranges(&self) -> Result<Vec<AddressRange>, StoreError> {
        Ok(self.ranges.clone())
    }

    async fn get_range(&self, id: &RangeId) -> Result<Option<AddressRange>, StoreError> {
        Ok(self.ranges.iter().find(|range| &range.id == id).cloned())
    }
}

#[async_trait]
impl HostRepository for JsonFileStore {
    async fn find_host_by_address(&self, addr: Ipv4Addr) -> Result<Option<Host>, StoreError> {
        let doc = self.doc.lock().await;
        Ok(doc.hosts.iter().find(|host| host.address == addr).cloned())
    }

    async fn upsert_host(&self, host: Host) -> Result<Host, StoreError> {
        self.commit(|doc| {
            match doc.hosts.iter_mut().find(|stored| stored.address == host.address) {
                Some(stored) => *stored = host.clone(),
                None => {
                    doc.hosts.push(host.clone());
                    doc.hosts.sort_by_key(|host| host.address);
                }
            }
            Ok(())
        })
        .await?;
        Ok(host)
    }

    async fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError> {
        Ok(self.doc.lock().await.hosts.clone())
    }
}

#[async_trait]
impl RunRepository for JsonFileStore {
    async fn record_run(&self, run: &ScanRun) -> Result<(), StoreError> {
        self.commit(|doc| {
            doc.runs.retain(|stored| stored.id != run.id);
            doc.runs.push(run.clone());
            Ok(())
        })
        .await
    }

    async fn update_run(&self, id: RunId, update: RunUpdate) -> Result<(), StoreError> {
        self.commit(|doc| {
            let run = doc
                .runs
                .iter_mut()
                .find(|run| run.id == id)
                .ok_or(StoreError::RunNotFound(id))?;
            update.apply(run);
            Ok(())
        })
        .await
    }

    async fn get_run(&self, id: RunId) -> Result<Option<ScanRun>, StoreError> {
        let doc = self.doc.lock().await;
        Ok(doc.runs.iter().find(|run| run.id == id).cloned())
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ipward_common::models::{HostObservation, RunStatus};
    use pnet::util::MacAddr;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ipward-{name}-{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn hosts_and_runs_survive_reopen() {
        let path = temp_path("reopen");
        let _ = tokio::fs::remove_file(&path).await;

        let addr = Ipv4Addr::new(192, 168, 1, 5);
        let obs = HostObservation::alive(addr).with_mac(Some(MacAddr::new(0, 0x11, 0x32, 1, 2, 3)));
        let run = ScanRun::start(RunId::new(), vec![RangeId::from("lan")]);
        {
            let store = JsonFileStore::open(&path, Vec::new()).await.unwrap();
            store
                .upsert_host(Host::discovered(&obs, RangeId::from("lan"), Utc::now()))
                .await
                .unwrap();
            store.record_run(&run).await.unwrap();
            store
                .update_run(run.id, RunUpdate::finished(RunStatus::Completed))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path, Vec::new()).await.unwrap();
        let host = reopened.find_host_by_address(addr).await.unwrap().unwrap();
        assert_eq!(host.range_id, Some(RangeId::from("lan")));
        assert_eq!(host.mac, obs.mac);

        let stored = reopened.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Completed);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let path = temp_path("corrupt");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result = JsonFileStore::open(&path, Vec::new()).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_leaves_the_store_unchanged() {
        let path = std::env::temp_dir()
            .join(format!("ipward-missing-{}", std::process::id()))
            .join("store.json");
        let store = JsonFileStore::open(&path, Vec::new()).await.unwrap();

        let addr = Ipv4Addr::new(192, 168, 1, 5);
        let host = Host::discovered(&HostObservation::alive(addr), RangeId::from("lan"), Utc::now());
        assert!(matches!(store.upsert_host(host).await, Err(StoreError::Io(_))));
        assert_eq!(store.find_host_by_address(addr).await.unwrap(), None);

        let run = ScanRun::start(RunId::new(), vec![RangeId::from("lan")]);
        assert!(store.record_run(&run).await.is_err());
        assert_eq!(store.get_run(run.id).await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn ranges_come_from_configuration() {
        let range = AddressRange::new(
            "office",
            "192.168.1.0/24".parse().unwrap(),
            Ipv4Addr::new(192, 168, 1, 1),
        );
        let store = JsonFileStore::open(temp_path("ranges"), vec![range.clone()])
            .await
            .unwrap();
        assert_eq!(store.list_ranges().await.unwrap(), vec![range.clone()]);
        assert_eq!(
            store.get_range(&RangeId::from("office")).await.unwrap(),
            Some(range)
        );
        assert_eq!(store.get_range(&RangeId::from("lab")).await.unwrap(), None);
    }
}
