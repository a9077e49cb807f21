//! # ipward core
//!
//! Discovery and address-ownership reconciliation.
//!
//! * [`resolver::RangeResolver`]: longest-prefix-match owner lookup.
//! * [`prober::Prober`]: liveness and metadata discovery for one address.
//! * [`scheduler::BatchScheduler`]: drives a prober over a range in batches.
//! * [`orchestrator::Orchestrator`]: run lifecycle across several ranges.
//! * [`reconcile::Reconciler`]: writes observations to the host store.
//! * [`events::ProgressBroadcaster`]: best-effort fan-out to observers.

pub mod error;
pub mod events;
pub mod network;
pub mod orchestrator;
pub mod prober;
pub mod progress;
pub mod reconcile;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod vendors;

pub use error::RunError;
pub use orchestrator::Orchestrator;
pub use resolver::RangeResolver;
