use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

/// One way of telling whether an address answers at all.
#[async_trait]
pub trait Reachability: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(false)` means no answer within `wait`. Errors mean the check could
    /// not be carried out (missing privilege, no route, ...).
    async fn is_reachable(&self, addr: Ipv4Addr, wait: Duration) -> anyhow::Result<bool>;
}

/// Primary check with retries, then a single slower fallback.
///
/// Worst case duration is `attempts * timeout + fallback_timeout`.
#[derive(Clone)]
pub struct LivenessCheck {
    primary: Arc<dyn Reachability>,
    fallback: Arc<dyn Reachability>,
    timeout: Duration,
    attempts: u32,
    fallback_timeout: Duration,
}

impl LivenessCheck {
    pub fn new(
        primary: Arc<dyn Reachability>,
        fallback: Arc<dyn Reachability>,
        timeout: Duration,
        attempts: u32,
        fallback_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
            attempts: attempts.max(1),
            fallback_timeout,
        }
    }

    pub async fn is_alive(&self, addr: Ipv4Addr) -> bool {
        for attempt in 1..=self.attempts {
            if Self::check(self.primary.as_ref(), addr, self.timeout).await {
                return true;
            }
            debug!(%addr, attempt, check = self.primary.name(), "no answer");
        }
        Self::check(self.fallback.as_ref(), addr, self.fallback_timeout).await
    }

    async fn check(check: &dyn Reachability, addr: Ipv4Addr, wait: Duration) -> bool {
        match timeout(wait, check.is_reachable(addr, wait)).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(e)) => {
                debug!(%addr, check = check.name(), "reachability check failed: {e:#}");
                false
            }
            Err(_elapsed) => false,
        }
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
