use thiserror::Error;

use crate::models::range::RangeId;
use crate::models::run::RunId;

/// Problems with an address range definition or its scannability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("invalid prefix: {0} > 32")]
    InvalidPrefix(u8),

    #[error("range {network} is too large: /{prefix} is shorter than the minimum /{min_prefix}")]
    PrefixTooShort {
        network: String,
        prefix: u8,
        min_prefix: u8,
    },

    #[error("range {network} holds {hosts} hosts, above the scan ceiling of {max_hosts}")]
    TooManyHosts {
        network: String,
        hosts: u64,
        max_hosts: u64,
    },
}

/// Failures reported by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Serialization(String),

    #[error("scan run {0} not found")]
    RunNotFound(RunId),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Configuration rejected before any run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("scan.batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("probe.attempts must be at least 1")]
    ZeroAttempts,

    #[error("events.subscriber_capacity must be at least 1")]
    ZeroCapacity,

    #[error("range id {0} is configured more than once")]
    DuplicateRange(RangeId),
}
