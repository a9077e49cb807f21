//! Packet builders and parsers used by the probing backends.
//!
//! Everything here is pure: functions take addresses and return bytes, or
//! take bytes and return what they mean. Sockets live in `ipward-core`.

pub mod arp;
pub mod dns;
pub mod ethernet;
pub mod icmp;

use thiserror::Error;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const ICMP_ECHO_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("buffer too small for an ethernet header")]
    EthernetBuffer,

    #[error("buffer too small for an ARP payload")]
    ArpBuffer,

    #[error("buffer too small for an ICMP echo")]
    IcmpBuffer,
}
