//! # Domain Models
//!
//! ## Core Entities
//! * [`range::AddressRange`]: a configured CIDR block that can own hosts.
//! * [`host::Host`]: the persisted record of a device, keyed by IPv4 address.
//! * [`run::ScanRun`]: one logical discovery run over one or more ranges.
//!
//! ## Value Objects
//! * [`host::HostObservation`]: what a single probe learned about one address.
//! * [`run::ScanProgress`]: probe counters of the active run.
//! * [`event::ScanEvent`]: lifecycle and discovery notifications for observers.

pub mod event;
pub mod host;
pub mod range;
pub mod run;

pub use event::ScanEvent;
pub use host::{DeviceClass, Host, HostObservation, Liveness, Provenance};
pub use range::{AddressRange, RangeId};
pub use run::{RunId, RunStatus, RunSummary, RunUpdate, ScanProgress, ScanRun};
