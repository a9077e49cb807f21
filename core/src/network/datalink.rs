use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use async_trait::async_trait;
use ipward_protocols::arp;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;
use tracing::debug;

use crate::network::interface::{self, LinkTarget};
use crate::prober::hardware::MacLookup;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Asks the wire: broadcasts an ARP who-has and waits for the reply.
#[derive(Debug, Clone, Copy)]
pub struct ArpRequest {
    wait: Duration,
}

impl ArpRequest {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

#[async_trait]
impl MacLookup for ArpRequest {
    fn name(&self) -> &'static str {
        "arp-request"
    }

    async fn lookup(&self, addr: Ipv4Addr) -> anyhow::Result<Option<MacAddr>> {
        let Some(link) = interface::for_target(addr) else {
            debug!(%addr, "no directly attached interface, skipping ARP");
            return Ok(None);
        };
        let wait = self.wait;
        tokio::task::spawn_blocking(move || {
            let (tx, rx) = open_eth_channel(&link.interface, &get_config(), datalink::channel)?;
            resolve(tx, rx, &link, addr, wait)
        })
        .await
        .context("ARP task failed")?
    }
}

fn resolve(
    mut tx: Box<dyn DataLinkSender>,
    mut rx: Box<dyn DataLinkReceiver>,
    link: &LinkTarget,
    addr: Ipv4Addr,
    wait: Duration,
) -> anyhow::Result<Option<MacAddr>> {
    let request = arp::create_request(link.src_mac, link.src_addr, addr)?;
    match tx.send_to(&request, None) {
        Some(Ok(())) => {}
        Some(Err(e)) => return Err(e).context("sending ARP request"),
        None => bail!("sending ARP request: sender refused the frame"),
    }

    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        let Ok(frame) = rx.next() else {
            continue;
        };
        if let Some((sender, mac)) = arp::parse_reply(frame) {
            if sender == addr && mac != MacAddr::zero() {
                return Ok(Some(mac));
            }
        }
    }
    Ok(None)
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
{
    let ch: Channel =
        channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
    use ipward_protocols::ETH_HDR_LEN;
    use pnet::datalink::dummy;
    use pnet::packet::arp::{ArpOperations, MutableArpPacket};

    const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 7, 2);
    const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x02);
    const PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 7, 40);
    const PEER_MAC: MacAddr = MacAddr(0x00, 0x1b, 0x21, 0x40, 0x40, 0x40);

    fn reply_from(addr: Ipv4Addr, mac: MacAddr) -> Box<[u8]> {
        let mut frame = arp::create_request(mac, addr, LOCAL).unwrap();
        MutableArpPacket::new(&mut frame[ETH_HDR_LEN..])
            .unwrap()
            .set_operation(ArpOperations::Reply);
        frame.into_boxed_slice()
    }

    fn link() -> LinkTarget {
        LinkTarget {
            interface: dummy::dummy_interface(0),
            src_mac: LOCAL_MAC,
            src_addr: LOCAL,
        }
    }

    #[test]
    fn reply_from_the_target_resolves_its_mac() {
        let mut wire = dummy::Config::default();
        let inject = wire.inject_handle().unwrap();
        let sent = wire.read_handle().unwrap();

        let link = link();
        let opener = move |i: &NetworkInterface, _: Config| dummy::channel(i, wire);
        let Ok((tx, rx)) = open_eth_channel(&link.interface, &get_config(), opener) else {
            panic!("dummy channel should open");
        };

        // noise first: a read error and someone else's reply
        inject
            .send(Err(std::io::Error::from(std::io::ErrorKind::TimedOut)))
            .unwrap();
        inject
            .send(Ok(reply_from(Ipv4Addr::new(192, 168, 7, 41), MacAddr(2, 2, 2, 2, 2, 2))))
            .unwrap();
        inject.send(Ok(reply_from(PEER, PEER_MAC))).unwrap();

        let mac = resolve(tx, rx, &link, PEER, Duration::from_secs(5)).unwrap();
        assert_eq!(mac, Some(PEER_MAC));

        let request = sent.try_recv().unwrap();
        assert_eq!(
            arp::parse_reply(&request),
            None,
            "outgoing frame must be a request"
        );
        assert_eq!(request.len(), ETH_HDR_LEN + ipward_protocols::ARP_LEN);
    }

    #[test]
    fn channel_open_failure_keeps_the_io_cause() {
        let intf = dummy::dummy_interface(0);
        let opener = |_: &NetworkInterface, _: Config| -> std::io::Result<Channel> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "raw sockets need CAP_NET_RAW",
            ))
        };

        let Err(err) = open_eth_channel(&intf, &get_config(), opener) else {
            panic!("expected the opener's I/O error");
        };
        assert!(err.to_string().contains("opening on eth0"));
        let cause = err.downcast_ref::<std::io::Error>();
        assert_eq!(
            cause.map(std::io::Error::kind),
            Some(std::io::ErrorKind::PermissionDenied)
        );
    }

    #[tokio::test]
    #[ignore = "needs CAP_NET_RAW and a gateway on 192.168.1.1"]
    async fn gateway_answers_arp_when_privileged() {
        let gateway = Ipv4Addr::new(192, 168, 1, 1);
        let mac = ArpRequest::new(Duration::from_secs(1)).lookup(gateway).await.unwrap();
        assert!(mac.is_some());
    }
}
