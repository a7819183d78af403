//! Bounded exponential backoff.

use std::time::Duration;

pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration, factor: f64) -> Self {
        Self {
            retries,
            base_delay,
            factor,
        }
    }

    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, 1.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Delay to wait after the failed attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.factor.max(1.0).powi(attempt as i32);
        self.base_delay.mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_BASE_DELAY, DEFAULT_BACKOFF_FACTOR)
    }
}
