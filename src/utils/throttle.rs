//! Post-request pauses that keep us within NCBI's usage policy.

use std::time::Duration;
use tokio::time::sleep;

use crate::config::RateLimitConfig;

/// Fixed pauses applied after each request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    batch: Duration,
    single: Duration,
}

impl Throttle {
    pub fn new(batch: Duration, single: Duration) -> Self {
        Self { batch, single }
    }

    /// No pauses
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch
    }

    pub fn single_delay(&self) -> Duration {
        self.single
    }

    /// Pause after a batched request
    pub async fn after_batch(&self) {
        pause(self.batch).await;
    }

    /// Pause after a single-item lookup
    pub async fn after_single(&self) {
        pause(self.single).await;
    }
}

impl From<&RateLimitConfig> for Throttle {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.batch_delay(), config.single_delay())
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    tracing::trace!("Throttling for {:?}", delay);
    sleep(delay).await;
}
