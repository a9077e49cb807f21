//! # Configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) yields a usable configuration.
//!
//! ```toml
//! [scan]
//! batch_size = 32
//!
//! [probe]
//! timeout_ms = 1000
//! no_dns = false
//!
//! [[ranges]]
//! id = "office"
//! network = "192.168.1.0/24"
//! gateway = "192.168.1.1"
//! ```

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::range::AddressRange;

pub const DEFAULT_PORTS: [u16; 11] = [21, 22, 23, 25, 53, 80, 139, 443, 445, 3389, 8080];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub probe: ProbeConfig,
    pub events: EventsConfig,
    pub store: StoreConfig,
    pub ranges: Vec<AddressRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Addresses probed concurrently per batch.
    pub batch_size: usize,
    /// Shortest prefix accepted for a scan.
    pub min_prefix: u8,
    /// Ceiling on usable hosts per range.
    pub max_hosts: u64,
    /// Pause between batches, as a percentage of `probe.timeout_ms`.
    pub inter_batch_delay_percent: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            min_prefix: 16,
            max_hosts: 4096,
            inter_batch_delay_percent: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
    pub attempts: u32,
    pub fallback_timeout_ms: u64,
    pub enrichment_timeout_ms: u64,
    pub ports: Vec<u16>,
    pub dns_server: Option<Ipv4Addr>,
    /// Disables reverse name lookups.
    pub no_dns: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            attempts: 2,
            fallback_timeout_ms: 3000,
            enrichment_timeout_ms: 2000,
            ports: DEFAULT_PORTS.to_vec(),
            dns_server: None,
            no_dns: false,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }

    /// Upper bound on a single probe.
    pub fn budget(&self) -> Duration {
        self.timeout() * self.attempts + self.fallback_timeout() + self.enrichment_timeout()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub subscriber_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ipward.json"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Loads `path` when given, otherwise falls back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("probe.timeout_ms"));
        }
        if self.probe.fallback_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("probe.fallback_timeout_ms"));
        }
        if self.probe.enrichment_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("probe.enrichment_timeout_ms"));
        }
        if self.probe.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.events.subscriber_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let mut seen = HashSet::new();
        for range in &self.ranges {
            if !seen.insert(&range.id) {
                return Err(ConfigError::DuplicateRange(range.id.clone()));
            }
        }
        Ok(())
    }
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
    use crate::models::range::RangeId;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.batch_size, 32);
        assert_eq!(config.probe.ports, DEFAULT_PORTS.to_vec());
        assert!(config.ranges.is_empty());
    }

    #[test]
    fn ranges_and_overrides_are_read() {
        let raw = r#"
            [scan]
            batch_size = 8

            [probe]
            timeout_ms = 250
            dns_server = "10.0.0.53"

            [[ranges]]
            id = "office"
            network = "192.168.1.0/24"
            gateway = "192.168.1.1"
            description = "first floor"
        "#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.scan.batch_size, 8);
        assert_eq!(config.scan.min_prefix, 16);
        assert_eq!(config.probe.timeout(), Duration::from_millis(250));
        assert_eq!(config.probe.dns_server, Some(Ipv4Addr::new(10, 0, 0, 53)));

        let range = &config.ranges[0];
        assert_eq!(range.id, RangeId::from("office"));
        assert_eq!(range.network.to_string(), "192.168.1.0/24");
        assert_eq!(range.description.as_deref(), Some("first floor"));
    }

    #[test]
    fn malformed_cidr_is_rejected() {
        let raw = r#"
            [[ranges]]
            id = "bad"
            network = "192.168.1.0/40"
            gateway = "192.168.1.1"
        "#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn validate_rejects_zero_values_and_duplicates() {
        let mut config = Config::default();
        config.scan.batch_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));

        let mut config = Config::default();
        config.probe.attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));

        let mut config = Config::default();
        config.probe.timeout_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("probe.timeout_ms"))
        );

        let raw = r#"
            [[ranges]]
            id = "lan"
            network = "10.0.0.0/24"
            gateway = "10.0.0.1"

            [[ranges]]
            id = "lan"
            network = "10.0.1.0/24"
            gateway = "10.0.1.1"
        "#;
        let err = Config::parse(raw).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn probe_budget_sums_every_stage() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.budget(), Duration::from_millis(2 * 1000 + 3000 + 2000));
    }
}
