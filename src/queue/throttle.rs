//! Outbound send pacing
//!
//! All bus traffic from one collector instance shares a single events-per-
//! second budget: consecutive sends are spaced `1_000_000 / eps`
//! microseconds apart. The throttle is an injected object so independent
//! instances (and tests) never share pacing state.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::trace;

use crate::LOG_TARGET;

/// Spacing between consecutive sends for an eps budget.
pub fn send_interval(eps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(eps.max(1)))
}

/// Shared send pacer, burst of one.
pub struct SendThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    interval: Duration,
}

impl SendThrottle {
    /// Create a throttle allowing `eps` sends per second. Zero is treated as one.
    pub fn per_second(eps: u32) -> Self {
        let interval = send_interval(eps);

        // Sub-microsecond spacing cannot be expressed as a period
        let quota = Quota::with_period(interval).unwrap_or_else(|| {
            Quota::per_second(NonZeroU32::new(eps).unwrap_or(NonZeroU32::MIN))
        });

        Self {
            limiter: RateLimiter::direct(quota),
            interval,
        }
    }

    /// Spacing enforced between two sends
    #[cfg(test)]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next send is allowed.
    pub async fn wait(&self) {
        if self.limiter.check().is_err() {
            trace!(target: LOG_TARGET, "Waiting {:?} send slot", self.interval);
            self.limiter.until_ready().await;
        }
    }
}
