pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod graph;
pub mod links;
pub mod oracle;
pub mod rate_limit;
pub mod result;
pub mod robots;
pub mod stats;

pub use config::{CrawlConfig, RetryPolicy};
pub use crawler::{CrawlOutcome, Crawler, ProgressCallback};
pub use error::{Result, ScanError};
pub use fetcher::Fetcher;
pub use graph::LinkGraph;
pub use oracle::LinkOracle;
pub use result::{CrawlTarget, PageResult};
pub use robots::{PolitenessGate, SiteInfo};
pub use stats::CrawlStats;
