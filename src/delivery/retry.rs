//! Backoff between failed delivery cycles

use crate::config::DeliveryConfig;
use std::time::Duration;

/// Exponential backoff for the refresh loop
///
/// The first failure sleeps `initial`; each further consecutive failure
/// multiplies the delay by `factor`, capped at `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(60),
            max: Duration::from_secs(600),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::default()
            .initial_delay(Duration::from_secs(config.fallback_interval_secs))
            .max_delay(Duration::from_secs(config.max_backoff_secs))
    }

    /// Set the delay after the first failure
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial = delay;
        self
    }

    /// Set the backoff ceiling
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max = delay;
        self
    }

    /// Sleep after `failures` consecutive failed cycles (`failures >= 1`)
    pub fn delay(&self, failures: u32) -> Duration {
        let ceiling = self.max.max(self.initial);
        let mut delay = self.initial;
        for _ in 1..failures {
            delay = delay.saturating_mul(self.factor.max(1));
            if delay >= ceiling {
                return ceiling;
            }
        }
        delay
    }
}
