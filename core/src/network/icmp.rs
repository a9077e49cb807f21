use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use ipward_protocols::icmp;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{self, TransportChannelType, TransportProtocol};

use crate::prober::liveness::Reachability;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// Raw ICMP echo. Needs raw-socket privilege.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpEcho;

#[async_trait]
impl Reachability for IcmpEcho {
    fn name(&self) -> &'static str {
        "icmp-echo"
    }

    async fn is_reachable(&self, addr: Ipv4Addr, wait: Duration) -> anyhow::Result<bool> {
        let identifier: u16 = rand::random();
        let sequence: u16 = rand::random();
        tokio::task::spawn_blocking(move || ping(addr, identifier, sequence, wait))
            .await
            .context("ICMP probe task failed")?
    }
}

fn ping(addr: Ipv4Addr, identifier: u16, sequence: u16, wait: Duration) -> anyhow::Result<bool> {
    let (mut tx, mut rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
        .context("opening ICMP channel")?;

    let request = icmp::create_echo_request(identifier, sequence)?;
    let packet = IcmpPacket::new(&request).context("building ICMP packet")?;
    tx.send_to(packet, IpAddr::V4(addr))
        .with_context(|| format!("sending echo request to {addr}"))?;

    let deadline = Instant::now() + wait;
    let mut replies = transport::icmp_packet_iter(&mut rx);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }
        match replies.next_with_timeout(remaining) {
            Ok(Some((reply, source))) => {
                let ours = source == IpAddr::V4(addr)
                    && icmp::parse_echo_reply(&reply) == Some((identifier, sequence));
                if ours {
                    return Ok(true);
                }
            }
            Ok(None) => return Ok(false),
            Err(e) => return Err(e).context("reading ICMP replies"),
        }
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

    #[tokio::test]
    #[ignore]
    async fn loopback_answers_echo_when_privileged() {
        let alive = IcmpEcho
            .is_reachable(Ipv4Addr::LOCALHOST, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(alive);
    }

    #[tokio::test]
    #[ignore]
    async fn documentation_range_stays_silent() {
        let alive = IcmpEcho
            .is_reachable(Ipv4Addr::new(203, 0, 113, 1), Duration::from_millis(300))
            .await
            .unwrap();
        assert!(!alive);
    }
}
