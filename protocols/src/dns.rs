use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::dns::{
    DnsClass, DnsPacket, DnsQuery, DnsResponse, DnsTypes, MutableDnsPacket, Opcode, Retcode,
};

pub const DNS_HDR_LEN: usize = 12;
pub const DNS_PORT: u16 = 53;

/// Answer to a PTR query.
///
/// `hostname` is `None` when the server answered without a PTR record
/// (NXDOMAIN or an empty answer section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtrAnswer {
    pub id: u16,
    pub hostname: Option<String>,
}

pub fn parse_ptr_response(payload: &[u8]) -> anyhow::Result<PtrAnswer> {
    let dns = DnsPacket::new(payload).context("Failed to parse DNS packet")?;
    anyhow::ensure!(dns.get_is_response() == 1, "DNS packet is a query");

    let hostname = dns
        .get_responses()
        .iter()
        .find_map(|response| match response.rtype {
            DnsTypes::PTR => hostname_from_ptr(response),
            _ => None,
        });

    Ok(PtrAnswer {
        id: dns.get_id(),
        hostname,
    })
}

pub fn create_ptr_packet(addr: Ipv4Addr, id: u16) -> anyhow::Result<Vec<u8>> {
    let query: DnsQuery = create_ptr_query(addr);
    let q_fixed_len: usize = 4;
    let total: usize = DNS_HDR_LEN + query.qname.len() + q_fixed_len;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    // Question section: qname, qtype, qclass
    let mut cursor: usize = DNS_HDR_LEN;
    buffer[cursor..cursor + query.qname.len()].copy_from_slice(&query.qname);
    cursor += query.qname.len();
    buffer[cursor..cursor + 2].copy_from_slice(&query.qtype.0.to_be_bytes());
    cursor += 2;
    buffer[cursor..cursor + 2].copy_from_slice(&query.qclass.0.to_be_bytes());

    Ok(buffer)
}

/// `192.168.1.5` becomes `5.1.168.192.in-addr.arpa`.
pub fn reverse_pointer_name(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa")
}

fn hostname_from_ptr(response: &DnsResponse) -> Option<String> {
    decode_dns_name(&response.data).filter(|name| !name.is_empty())
}

fn create_ptr_query(addr: Ipv4Addr) -> DnsQuery {
    DnsQuery {
        qname: encode_dns_name(&reverse_pointer_name(addr)),
        qtype: DnsTypes::PTR,
        qclass: DnsClass(1),
        payload: Vec::new(),
    }
}

fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

/// Decodes uncompressed labels. A compression pointer ends the name, since
/// the record data is detached from the message it points into.
fn decode_dns_name(data: &[u8]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut cursor: usize = 0;
    while cursor < data.len() {
        let len: usize = data[cursor] as usize;
        if len == 0 || len & 0xc0 == 0xc0 {
            break;
        }
        cursor += 1;
        if cursor + len > data.len() {
            return None;
        }
        let label: &str = std::str::from_utf8(&data[cursor..cursor + len]).ok()?;
        parts.push(label);
        cursor += len;
    }
    Some(parts.join("."))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
