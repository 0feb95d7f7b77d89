//! src/network/rate_limit.rs
//!
//! Per-client request budget, wrapping the `governor` crate.

use axum::http::HeaderMap;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::RateLimitConfig;

/// Key used when a request carries no client address.
pub const SHARED_KEY: &str = "shared";

/// A keyed rate limiter: `max_requests` per `window`, refilled evenly.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
}

impl RateLimiter {
    /// Creates a new rate limiter allowing `requests` per `window`.
    pub fn new(requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        Self {
            limiter: Arc::new(GovernorRateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_millis(config.window_ms))
    }

    /// `Err` carries the whole seconds to wait before retrying.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        })
    }

    /// Forget clients whose budget is full again.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        debug!(tracked = self.limiter.len(), "rate limiter cleanup");
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// First `x-forwarded-for` entry, else the shared key.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(SHARED_KEY)
        .to_string()
}
