//! Minimum-interval gate for outbound requests.

use std::time::Duration;

use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Spaces requests at least `min_interval` apart.
///
/// Each transport owns its own limiter, so two transports (or two tests) never
/// share timing state. A zero interval disables the gate.
pub struct RequestLimiter {
    min_interval: Duration,
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, QuantaClock>>,
}

impl RequestLimiter {
    pub fn new(min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval).map(RateLimiter::direct);
        Self {
            min_interval,
            limiter,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the next request may be sent.
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        if limiter.check().is_ok() {
            return;
        }
        debug!(
            "Request is ratelimited ({}ms interval). Waiting...",
            self.min_interval.as_millis()
        );
        limiter.until_ready().await;
    }
}

impl Default for RequestLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
