use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "SiteScore-Audit-Bot/1.0 (Technical SEO Audit Tool)";

/// Knobs for a single crawl invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub concurrency: usize,
    pub respect_robots: bool,
    pub requests_per_second: u32,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    /// How long an idle worker keeps polling an empty frontier before exiting.
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            concurrency: 10,
            respect_robots: true,
            requests_per_second: 2,
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
            idle_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(25),
            retry: RetryPolicy::default(),
        }
    }
}

impl CrawlConfig {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_respect_robots(mut self, respect_robots: bool) -> Self {
        self.respect_robots = respect_robots;
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Applies the builder minimums to a config that came from elsewhere, e.g. JSON.
    pub fn normalized(mut self) -> Self {
        self.max_pages = self.max_pages.max(1);
        self.concurrency = self.concurrency.max(1);
        self.requests_per_second = self.requests_per_second.max(1);
        self.retry = RetryPolicy::new(
            self.retry.max_attempts,
            self.retry.min_backoff,
            self.retry.max_backoff,
        );
        self
    }
}

/// Exponential backoff between attempts, clamped to `[min_backoff, max_backoff]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_secs")]
    pub min_backoff: Duration,
    #[serde(with = "duration_secs")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_backoff,
            max_backoff: max_backoff.max(min_backoff),
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.min_backoff.saturating_mul(1u32 << exponent);
        delay.clamp(self.min_backoff, self.max_backoff)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
