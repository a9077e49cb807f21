use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::prober::liveness::Reachability;

/// Ports tried when looking for any sign of life.
pub const LIVENESS_PORTS: [u16; 4] = [80, 443, 22, 445];

#[derive(Debug, PartialEq, Eq)]
enum Handshake {
    Completed,
    Refused,
    Silent,
}

async fn handshake(addr: SocketAddr, wait: Duration) -> Handshake {
    match timeout(wait, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Handshake::Completed,
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Handshake::Refused,
        Ok(Err(_)) | Err(_) => Handshake::Silent,
    }
}

/// Liveness through TCP connects.
///
/// A completed handshake and an RST both prove somebody is home.
#[derive(Debug, Clone)]
pub struct TcpHandshake {
    ports: Vec<u16>,
}

impl TcpHandshake {
    pub fn new(ports: Vec<u16>) -> Self {
        Self { ports }
    }
}

impl Default for TcpHandshake {
    fn default() -> Self {
        Self::new(LIVENESS_PORTS.to_vec())
    }
}

#[async_trait]
impl Reachability for TcpHandshake {
    fn name(&self) -> &'static str {
        "tcp-handshake"
    }

    async fn is_reachable(&self, addr: Ipv4Addr, wait: Duration) -> anyhow::Result<bool> {
        let mut attempts = JoinSet::new();
        for port in &self.ports {
            let target = SocketAddr::V4(SocketAddrV4::new(addr, *port));
            attempts.spawn(handshake(target, wait));
        }
        while let Some(result) = attempts.join_next().await {
            if matches!(result, Ok(Handshake::Completed | Handshake::Refused)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Ports that completed a handshake, sorted.
pub async fn open_ports(addr: Ipv4Addr, ports: &[u16], wait: Duration) -> Vec<u16> {
    let mut attempts = JoinSet::new();
    for port in ports.iter().copied() {
        let target = SocketAddr::V4(SocketAddrV4::new(addr, port));
        attempts.spawn(async move { (port, handshake(target, wait).await) });
    }

    let mut open = Vec::new();
    while let Some(result) = attempts.join_next().await {
        if let Ok((port, Handshake::Completed)) = result {
            open.push(port);
        }
    }
    open.sort_unstable();
    open
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
