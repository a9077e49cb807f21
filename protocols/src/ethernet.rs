use pnet::packet::ethernet::{EtherType, MutableEthernetPacket};
use pnet::util::MacAddr;

use crate::PacketError;

/// Writes source, destination and ether type into the first 14 bytes.
pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    ether_type: EtherType,
) -> Result<(), PacketError> {
    let mut eth = MutableEthernetPacket::new(buffer).ok_or(PacketError::EthernetBuffer)?;
    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(ether_type);
    Ok(())
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
    use crate::ETH_HDR_LEN;
    use pnet::packet::ethernet::{EtherTypes, EthernetPacket};

    #[test]
    fn header_fields_are_written() {
        let mut buffer = [0u8; ETH_HDR_LEN];
        let src = MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);
        let dst = MacAddr::broadcast();

        make_header(&mut buffer, src, dst, EtherTypes::Arp).unwrap();

        let eth = EthernetPacket::new(&buffer).unwrap();
        assert_eq!(eth.get_source(), src);
        assert_eq!(eth.get_destination(), dst);
        assert_eq!(eth.get_ethertype(), EtherTypes::Arp);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut tiny = [0u8; 4];
        let err = make_header(&mut tiny, MacAddr::zero(), MacAddr::zero(), EtherTypes::Arp)
            .unwrap_err();
        assert_eq!(err, PacketError::EthernetBuffer);
    }
}
