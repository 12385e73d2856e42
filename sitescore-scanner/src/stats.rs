use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Running counters, shared by every worker of one crawl.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    crawled: AtomicUsize,
    failed: AtomicUsize,
    blocked_by_robots: AtomicUsize,
}

impl CrawlCounters {
    pub fn record_crawled(&self) -> usize {
        self.crawled.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked(&self) {
        self.blocked_by_robots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> CrawlStats {
        let duration_secs = (finished_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        CrawlStats {
            crawled: self.crawled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            blocked_by_robots: self.blocked_by_robots.load(Ordering::Relaxed),
            started_at,
            finished_at,
            duration_secs,
        }
    }
}

/// Final crawl statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub crawled: usize,
    pub failed: usize,
    pub blocked_by_robots: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
}
