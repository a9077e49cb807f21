//! Stores implementing the collaborator traits from
//! [`ipward_common::store`].
//!
//! * [`memory::MemoryStore`]: everything in memory, for tests and embedding.
//! * [`json::JsonFileStore`]: hosts and runs in one JSON document on disk,
//!   ranges from configuration.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
