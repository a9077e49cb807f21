use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipward_common::config::ProbeConfig;
use ipward_common::models::HostObservation;
use ipward_common::vendors::VendorRepository;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::Prober;
use super::hardware::{MacLookup, MacLookupChain};
use super::liveness::{LivenessCheck, Reachability};
use super::names::{DnsPtrResolver, NameResolver};
use crate::network::icmp::IcmpEcho;
use crate::network::tcp::{self, TcpHandshake};
use crate::vendors::MacOuiRepo;

/// Liveness first, then concurrent enrichment of live hosts.
pub struct NetworkProber {
    liveness: LivenessCheck,
    macs: Arc<dyn MacLookup>,
    names: Option<Arc<dyn NameResolver>>,
    vendors: Arc<dyn VendorRepository>,
    ports: Vec<u16>,
    port_timeout: Duration,
    enrichment_timeout: Duration,
}

impl NetworkProber {
    pub fn new(
        liveness: LivenessCheck,
        macs: Arc<dyn MacLookup>,
        vendors: Arc<dyn VendorRepository>,
    ) -> Self {
        Self {
            liveness,
            macs,
            names: None,
            vendors,
            ports: Vec::new(),
            port_timeout: Duration::from_millis(500),
            enrichment_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_names(mut self, names: Arc<dyn NameResolver>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>, port_timeout: Duration) -> Self {
        self.ports = ports;
        self.port_timeout = port_timeout;
        self
    }

    pub fn with_enrichment_timeout(mut self, enrichment_timeout: Duration) -> Self {
        self.enrichment_timeout = enrichment_timeout;
        self
    }

    /// Picks backends for the current process.
    ///
    /// Raw ICMP and ARP need raw-socket privilege; without it liveness is
    /// decided by TCP handshakes only.
    pub fn from_config(cfg: &ProbeConfig) -> Self {
        let privileged = is_root::is_root();
        let fallback: Arc<dyn Reachability> = Arc::new(TcpHandshake::default());
        let primary: Arc<dyn Reachability> = if privileged {
            Arc::new(IcmpEcho)
        } else {
            fallback.clone()
        };
        if !privileged {
            debug!("not running as root, ICMP and ARP probing disabled");
        }

        let liveness = LivenessCheck::new(
            primary,
            fallback,
            cfg.timeout(),
            cfg.attempts,
            cfg.fallback_timeout(),
        );
        let macs = Arc::new(MacLookupChain::platform_default(privileged, cfg.timeout()));

        let mut prober = Self::new(liveness, macs, Arc::new(MacOuiRepo))
            .with_ports(cfg.ports.clone(), cfg.timeout())
            .with_enrichment_timeout(cfg.enrichment_timeout());

        if !cfg.no_dns {
            let resolver = match cfg.dns_server {
                Some(server) => Ok(DnsPtrResolver::with_server(server, cfg.timeout())),
                None => DnsPtrResolver::from_system(cfg.timeout()),
            };
            match resolver {
                Ok(resolver) => prober = prober.with_names(Arc::new(resolver)),
                Err(e) => warn!("reverse name lookups disabled: {e:#}"),
            }
        }
        prober
    }

    async fn hostname(&self, addr: Ipv4Addr) -> Option<String> {
        let names = self.names.as_ref()?;
        self.bounded(addr, "reverse name", names.reverse_lookup(addr))
            .await
            .flatten()
    }

    async fn mac(&self, addr: Ipv4Addr) -> Option<pnet::util::MacAddr> {
        self.bounded(addr, "hardware address", self.macs.lookup(addr))
            .await
            .flatten()
    }

    async fn open_ports(&self, addr: Ipv4Addr) -> Vec<u16> {
        if self.ports.is_empty() {
            return Vec::new();
        }
        let scan = async { anyhow::Ok(tcp::open_ports(addr, &self.ports, self.port_timeout).await) };
        self.bounded(addr, "open ports", scan).await.unwrap_or_default()
    }

    /// Runs one enrichment step under the enrichment budget. Failures and
    /// timeouts become `None`.
    async fn bounded<T>(
        &self,
        addr: Ipv4Addr,
        step: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Option<T> {
        match timeout(self.enrichment_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                debug!(%addr, step, "enrichment failed: {e:#}");
                None
            }
            Err(_elapsed) => {
                debug!(%addr, step, "enrichment timed out");
                None
            }
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, addr: Ipv4Addr) -> HostObservation {
        if !self.liveness.is_alive(addr).await {
            return HostObservation::unreachable(addr);
        }

        let (hostname, mac, open_ports) =
            tokio::join!(self.hostname(addr), self.mac(addr), self.open_ports(addr));
        let vendor = mac.and_then(|mac| self.vendors.get_vendor(mac));

        HostObservation::alive(addr)
            .with_hostname(hostname)
            .with_mac(mac)
            .with_vendor(vendor)
            .with_open_ports(open_ports)
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
