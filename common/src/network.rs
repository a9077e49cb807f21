//! IPv4 value types used to describe address ranges.
//!
//! * [`cidr::Cidr`]: a network address plus prefix length, always stored masked.
//! * [`range::Ipv4Range`]: an inclusive run of addresses, used to enumerate hosts.

pub mod cidr;
pub mod range;

pub use cidr::Cidr;
pub use range::Ipv4Range;
