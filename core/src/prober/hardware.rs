//! Hardware-address discovery.
//!
//! Strategies are tried in order and the first non-zero answer wins:
//! the kernel neighbour cache, then the platform neighbour command, then
//! (with privilege) an ARP request on the wire.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pnet::util::MacAddr;
use tokio::process::Command;
use tracing::debug;

use crate::network::datalink::ArpRequest;

const PROC_ARP: &str = "/proc/net/arp";

#[async_trait]
pub trait MacLookup: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>>;
}

pub struct MacLookupChain {
    strategies: Vec<Box<dyn MacLookup>>,
}

impl MacLookupChain {
    pub fn new(strategies: Vec<Box<dyn MacLookup>>) -> Self {
        Self { strategies }
    }

    /// Cache, command, and ARP on the wire when `privileged`.
    pub fn platform_default(privileged: bool, arp_timeout: Duration) -> Self {
        let mut strategies: Vec<Box<dyn MacLookup>> = Vec::new();
        if cfg!(target_os = "linux") {
            strategies.push(Box::new(NeighborTable::default()));
        }
        strategies.push(Box::new(NeighborCommand));
        if privileged {
            strategies.push(Box::new(ArpRequest::new(arp_timeout)));
        }
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl MacLookup for MacLookupChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>> {
        for strategy in &self.strategies {
            match strategy.lookup(addr).await {
                Ok(Some(mac)) if mac != MacAddr::zero() => return Ok(Some(mac)),
                Ok(_) => {}
                Err(e) => debug!(%addr, strategy = strategy.name(), "mac lookup failed: {e:#}"),
            }
        }
        Ok(None)
    }
}

/// Reads the kernel neighbour cache.
pub struct NeighborTable {
    path: PathBuf,
}

impl NeighborTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for NeighborTable {
    fn default() -> Self {
        Self::new(PROC_ARP)
    }
}

#[async_trait]
impl MacLookup for NeighborTable {
    fn name(&self) -> &'static str {
        "neighbor-table"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        Ok(parse_proc_arp(&content, addr))
    }
}

/// Asks `ip neigh` (Linux) or `arp -n` (elsewhere).
pub struct NeighborCommand;

#[async_trait]
impl MacLookup for NeighborCommand {
    fn name(&self) -> &'static str {
        "neighbor-command"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>> {
        let target = addr.to_string();
        let mut command = if cfg!(target_os = "linux") {
            let mut cmd = Command::new("ip");
            cmd.args(["neigh", "show", &target]);
            cmd
        } else {
            let mut cmd = Command::new("arp");
            cmd.args(["-n", &target]);
            cmd
        };
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .context("running neighbour command")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_neighbor_output(&stdout, addr))
    }
}

/// Entry for `addr` in `/proc/net/arp` format.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
pub fn parse_proc_arp(content: &str, addr: Ipv4Addr) -> Option<MacAddr> {
    content.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [ip, _hw_type, flags, hw_addr, ..] = fields.as_slice() else {
            return None;
        };
        if ip.parse::<Ipv4Addr>().ok()? != addr || *flags == "0x0" {
            return None;
        }
        non_zero(hw_addr.parse().ok()?)
    })
}

/// Entry for `addr` in `ip neigh` or `arp -n` output.
///
/// Handles `10.0.0.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE` as well
/// as `? (10.0.0.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`.
pub fn parse_neighbor_output(output: &str, addr: Ipv4Addr) -> Option<MacAddr> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        let mentions_addr = tokens
            .clone()
            .any(|token| token.trim_matches(|c| c == '(' || c == ')') == addr.to_string());
        if !mentions_addr {
            return None;
        }
        tokens
            .find(|token| token.contains(':'))
            .and_then(|token| token.parse::<MacAddr>().ok())
            .and_then(non_zero)
    })
}

fn non_zero(mac: MacAddr) -> Option<MacAddr> {
    (mac != MacAddr::zero()).then_some(mac)
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
    const MAC: MacAddr = MacAddr(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);

    const PROC_ARP_SAMPLE: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
192.168.1.7      0x1         0x0         00:00:00:00:00:00     *        eth0
192.168.1.9      0x1         0x2         11:22:33:44:55:66     *        eth0
";

    #[test]
    fn proc_arp_finds_complete_entries_only() {
        assert_eq!(parse_proc_arp(PROC_ARP_SAMPLE, GATEWAY), Some(MAC));
        assert_eq!(parse_proc_arp(PROC_ARP_SAMPLE, Ipv4Addr::new(192, 168, 1, 7)), None);
        assert_eq!(parse_proc_arp(PROC_ARP_SAMPLE, Ipv4Addr::new(192, 168, 1, 8)), None);
    }

    #[test]
    fn neighbor_output_formats() {
        let linux = "192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE\n";
        assert_eq!(parse_neighbor_output(linux, GATEWAY), Some(MAC));

        let bsd = "? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]\n";
        assert_eq!(parse_neighbor_output(bsd, GATEWAY), Some(MAC));

        let failed = "192.168.1.1 dev eth0 FAILED\n";
        assert_eq!(parse_neighbor_output(failed, GATEWAY), None);

        let other = "192.168.1.10 dev eth0 lladdr aa:bb:cc:dd:ee:ff STALE\n";
        assert_eq!(parse_neighbor_output(other, GATEWAY), None);
    }

    struct Fixed {
        answer: anyhow::Result<Option<MacAddr>>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl MacLookup for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(mac) => Ok(*mac),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn fixed(answer: anyhow::Result<Option<MacAddr>>) -> (Box<dyn MacLookup>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let lookup = Fixed {
            answer,
            calls: calls.clone(),
        };
        (Box::new(lookup), calls)
    }

    #[tokio::test]
    async fn chain_skips_errors_and_zero_macs_and_stops_at_first_hit() {
        let (failing, _) = fixed(Err(anyhow::anyhow!("no such file")));
        let (incomplete, _) = fixed(Ok(Some(MacAddr::zero())));
        let (hit, _) = fixed(Ok(Some(MAC)));
        let (never, never_calls) = fixed(Ok(Some(MacAddr::broadcast())));

        let chain = MacLookupChain::new(vec![failing, incomplete, hit, never]);
        assert_eq!(chain.lookup(GATEWAY).await.unwrap(), Some(MAC));
        assert_eq!(never_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_no_mac() {
        let (miss, _) = fixed(Ok(None));
        let chain = MacLookupChain::new(vec![miss]);
        assert_eq!(chain.lookup(GATEWAY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn neighbor_table_reads_from_file() {
        let path = std::env::temp_dir().join(format!("ipward-arp-{}", std::process::id()));
        tokio::fs::write(&path, PROC_ARP_SAMPLE).await.unwrap();

        let table = NeighborTable::new(&path);
        assert_eq!(table.lookup(GATEWAY).await.unwrap(), Some(MAC));

        tokio::fs::remove_file(&path).await.unwrap();
        assert!(table.lookup(GATEWAY).await.is_err());
    }
}
