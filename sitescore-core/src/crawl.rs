use crate::error::Result;
use crate::pipeline::AuditPipeline;
use crate::report::AuditReport;
use crate::scoring::ScoringConfig;
use indicatif::{ProgressBar, ProgressStyle};
use sitescore_scanner::links::extract_url_path;
use sitescore_scanner::{CrawlConfig, ProgressCallback};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for one audit run
pub struct AuditOptions {
    pub url: String,
    pub crawl: CrawlConfig,
    pub scoring: ScoringConfig,
    pub show_progress: bool,
    pub cancellation: Option<CancellationToken>,
}

impl AuditOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            crawl: CrawlConfig::default(),
            scoring: ScoringConfig::default(),
            show_progress: false,
            cancellation: None,
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting crawl...");
    pb
}

/// Runs the audit, driving a spinner from the crawler's progress callback
/// when `show_progress` is set.
pub async fn execute_audit(options: AuditOptions) -> Result<AuditReport> {
    let AuditOptions {
        url,
        crawl,
        scoring,
        show_progress,
        cancellation,
    } = options;

    let max_pages = crawl.max_pages;
    let mut pipeline = AuditPipeline::new(crawl, scoring);
    if let Some(token) = cancellation {
        pipeline = pipeline.with_cancellation(token);
    }

    let progress_bar = show_progress.then(|| Arc::new(spinner()));
    let processed = Arc::new(AtomicUsize::new(0));

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let processed = processed.clone();
        let callback: ProgressCallback = Arc::new(move |worker_id: usize, url: String| {
            let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!(
                "Crawling... {}/{} pages  [worker {}] {}",
                count,
                max_pages,
                worker_id,
                extract_url_path(&url)
            ));
        });
        pipeline = pipeline.with_progress_callback(callback);
    }

    let result = pipeline.run(&url).await;

    if let Some(ref pb) = progress_bar {
        match result {
            Ok(ref report) => pb.finish_with_message(format!(
                "Audit complete! {} pages scored",
                report.site_stats.total_pages
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result
}
