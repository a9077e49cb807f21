//! # ipward common
//!
//! Shared vocabulary of the workspace: the domain models exchanged between the
//! scanner core and its callers, the IPv4/CIDR value types, the configuration
//! model and the traits describing the collaborators the core depends on.
//!
//! * **[`models`]**: address ranges, hosts, observations, scan runs and events.
//! * **[`network`]**: CIDR blocks and inclusive IPv4 ranges.
//! * **[`store`]**: range, host and run repositories (persistence collaborators).
//! * **[`vendors`]**: hardware-address to vendor lookup.
//! * **[`config`]**: TOML backed configuration.
//! * **[`error`]**: typed errors shared across crates.

pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod store;
pub mod vendors;
