use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes, checksum};

use crate::{ICMP_ECHO_LEN, PacketError};

/// ICMPv4 echo request with an empty payload and a valid checksum.
pub fn create_echo_request(identifier: u16, sequence: u16) -> Result<Vec<u8>, PacketError> {
    let mut buffer = vec![0u8; ICMP_ECHO_LEN];
    {
        let mut echo = MutableEchoRequestPacket::new(&mut buffer).ok_or(PacketError::IcmpBuffer)?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_checksum(0);
    }

    let sum = IcmpPacket::new(&buffer)
        .map(|icmp| checksum(&icmp))
        .ok_or(PacketError::IcmpBuffer)?;
    buffer[2..4].copy_from_slice(&sum.to_be_bytes());
    Ok(buffer)
}

/// `(identifier, sequence)` of an echo reply, `None` for any other message.
pub fn parse_echo_reply(icmp: &IcmpPacket) -> Option<(u16, u16)> {
    if icmp.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    let reply = EchoReplyPacket::new(icmp.packet())?;
    Some((reply.get_identifier(), reply.get_sequence_number()))
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
    use pnet::packet::icmp::echo_request::EchoRequestPacket;

    #[test]
    fn echo_request_carries_ids_and_valid_checksum() {
        let bytes = create_echo_request(0xbeef, 7).unwrap();
        let echo = EchoRequestPacket::new(&bytes).unwrap();
        assert_eq!(echo.get_icmp_type(), IcmpTypes::EchoRequest);
        assert_eq!(echo.get_identifier(), 0xbeef);
        assert_eq!(echo.get_sequence_number(), 7);

        let icmp = IcmpPacket::new(&bytes).unwrap();
        assert_eq!(checksum(&icmp), icmp.get_checksum());
    }

    #[test]
    fn reply_is_matched_but_request_is_not() {
        let mut bytes = create_echo_request(42, 3).unwrap();
        let request = IcmpPacket::new(&bytes).unwrap();
        assert_eq!(parse_echo_reply(&request), None);

        bytes[0] = IcmpTypes::EchoReply.0;
        let reply = IcmpPacket::new(&bytes).unwrap();
        assert_eq!(parse_echo_reply(&reply), Some((42, 3)));
    }
}
