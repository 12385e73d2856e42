//! Shared outbound request limiter.
//!
//! A token bucket from the governor crate. One instance is shared by every
//! worker of a crawl, so the rate is a crawl-wide ceiling, not a per-worker one.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    requests_per_second: u32,
}

impl RateLimiter {
    /// A limiter admitting `requests_per_second` requests per second. Zero is treated as one.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(rate))),
            requests_per_second: rate.get(),
        }
    }

    /// Waits until a token is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
        trace!("Rate limiter token acquired");
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_burst_then_throttle() {
        let limiter = RateLimiter::per_second(5);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(150));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_clones_share_the_bucket() {
        let limiter = RateLimiter::per_second(2);
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        assert_eq!(RateLimiter::per_second(0).requests_per_second(), 1);
    }
}
