//! Socket-level probing backends.
//!
//! * [`icmp`]: raw ICMP echo (needs raw-socket privilege).
//! * [`tcp`]: TCP handshakes for liveness and open-port checks.
//! * [`datalink`]: ARP who-has on the link that holds the target.
//! * [`interface`]: picks the local interface facing a target.

pub mod datalink;
pub mod icmp;
pub mod interface;
pub mod tcp;
