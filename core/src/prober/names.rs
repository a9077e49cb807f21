use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use ipward_protocols::dns::{self, DNS_PORT};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const RESOLV_CONF: &str = "/etc/resolv.conf";
const MAX_DNS_PAYLOAD: usize = 1500;

#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Name registered for `addr`, `Ok(None)` when there is none.
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<String>>;
}

/// PTR lookups over UDP against a single resolver.
#[derive(Debug, Clone)]
pub struct DnsPtrResolver {
    server: SocketAddr,
    timeout: Duration,
}

impl DnsPtrResolver {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn with_server(server: Ipv4Addr, timeout: Duration) -> Self {
        Self::new(SocketAddr::V4(SocketAddrV4::new(server, DNS_PORT)), timeout)
    }

    /// Uses the first IPv4 nameserver from `/etc/resolv.conf`.
    pub fn from_system(timeout: Duration) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(RESOLV_CONF)
            .with_context(|| format!("reading {RESOLV_CONF}"))?;
        let server = parse_resolv_conf(&content)
            .with_context(|| format!("no IPv4 nameserver in {RESOLV_CONF}"))?;
        Ok(Self::with_server(server, timeout))
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

#[async_trait]
impl NameResolver for DnsPtrResolver {
    async fn reverse_lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<String>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.context("binding DNS socket")?;
        socket.connect(self.server).await.context("connecting to resolver")?;

        let id: u16 = rand::random();
        let query = dns::create_ptr_packet(addr, id)?;
        socket.send(&query).await.context("sending PTR query")?;

        let mut buffer = [0u8; MAX_DNS_PAYLOAD];
        let answer = timeout(self.timeout, async {
            loop {
                let len = socket.recv(&mut buffer).await?;
                match dns::parse_ptr_response(&buffer[..len]) {
                    Ok(answer) if answer.id == id => return anyhow::Ok(answer),
                    _ => continue,
                }
            }
        })
        .await
        .with_context(|| format!("PTR lookup for {addr} timed out"))??;

        Ok(answer
            .hostname
            .map(|name| name.trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty()))
    }
}

/// First IPv4 `nameserver` line.
pub fn parse_resolv_conf(content: &str) -> Option<Ipv4Addr> {
    content.lines().find_map(|line| {
        let line = line.split(['#', ';']).next()?.trim();
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("nameserver"), Some(server)) => server.parse().ok(),
            _ => None,
        }
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
