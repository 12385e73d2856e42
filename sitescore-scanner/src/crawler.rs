use crate::config::CrawlConfig;
use crate::error::{Result, ScanError};
use crate::fetcher::Fetcher;
use crate::graph::LinkGraph;
use crate::links::{extract_internal_links, normalize_url, registrable_domain};
use crate::oracle::{LinkOracle, validate_suggestions};
use crate::rate_limit::RateLimiter;
use crate::result::{CrawlTarget, PageResult};
use crate::robots::{PolitenessGate, SiteInfo};
use crate::stats::{CrawlCounters, CrawlStats};
use chrono::Utc;
use futures::FutureExt;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Everything a finished crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Normalized seed URL.
    pub seed: String,
    pub base_domain: String,
    /// Keyed by the normalized request URL.
    pub results: BTreeMap<String, PageResult>,
    pub graph: LinkGraph,
    pub stats: CrawlStats,
    pub site_info: SiteInfo,
    pub page_cap_reached: bool,
}

/// Shared FIFO frontier. Every decision that touches the visited set or the
/// page cap happens under the one lock that guards this struct.
#[derive(Debug, Default)]
struct Frontier {
    queue: VecDeque<CrawlTarget>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    blocked: HashSet<String>,
    in_flight: usize,
    cap_reached: bool,
}

enum Next {
    Fetch(CrawlTarget),
    Skip,
    Blocked(String),
    Idle,
    Drained,
    Stop,
}

impl Frontier {
    fn seeded(seed: &str) -> Self {
        let mut frontier = Self::default();
        frontier.queued.insert(seed.to_string());
        frontier.queue.push_back(CrawlTarget::new(seed, 0));
        frontier
    }

    fn next(&mut self, max_pages: usize, gate: Option<&PolitenessGate>) -> Next {
        let Some(target) = self.queue.pop_front() else {
            return if self.in_flight == 0 {
                Next::Drained
            } else {
                Next::Idle
            };
        };
        self.queued.remove(&target.url);

        if self.visited.contains(&target.url) || self.blocked.contains(&target.url) {
            return Next::Skip;
        }
        if self.visited.len() >= max_pages {
            self.cap_reached = true;
            return Next::Stop;
        }
        if let Some(gate) = gate
            && !gate.can_fetch(&target.url)
        {
            self.blocked.insert(target.url.clone());
            return Next::Blocked(target.url);
        }

        self.visited.insert(target.url.clone());
        self.in_flight += 1;
        Next::Fetch(target)
    }

    /// Enqueues discovered links and releases the in-flight slot in one step,
    /// so no worker can observe an empty queue with nothing in flight while
    /// links are still on their way in.
    fn complete(
        &mut self,
        depth: usize,
        priority: Vec<String>,
        links: impl IntoIterator<Item = String>,
        max_pages: usize,
    ) {
        for url in priority.into_iter().rev() {
            if self.visited.contains(&url) || self.blocked.contains(&url) {
                continue;
            }
            if self.queued.contains(&url) {
                self.queue.retain(|t| t.url != url);
            } else if self.visited.len() + self.queue.len() >= max_pages {
                continue;
            }
            self.queued.insert(url.clone());
            self.queue.push_front(CrawlTarget::new(url, depth + 1));
        }

        for url in links {
            if self.visited.contains(&url)
                || self.queued.contains(&url)
                || self.blocked.contains(&url)
            {
                continue;
            }
            if self.visited.len() + self.queue.len() >= max_pages {
                self.cap_reached = true;
                break;
            }
            self.queued.insert(url.clone());
            self.queue.push_back(CrawlTarget::new(url, depth + 1));
        }

        self.in_flight = self.in_flight.saturating_sub(1);
    }
}

/// State cloned into every worker task.
#[derive(Clone)]
struct WorkerContext {
    config: Arc<CrawlConfig>,
    fetcher: Fetcher,
    gate: Option<Arc<PolitenessGate>>,
    seed: Arc<str>,
    base_domain: Arc<str>,
    frontier: Arc<Mutex<Frontier>>,
    results: Arc<Mutex<BTreeMap<String, PageResult>>>,
    graph: Arc<Mutex<LinkGraph>>,
    counters: Arc<CrawlCounters>,
    progress_callback: Option<ProgressCallback>,
    link_oracle: Option<Arc<dyn LinkOracle>>,
    cancel: CancellationToken,
}

/// Bounded-concurrency breadth-first crawler for a single site.
pub struct Crawler {
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
    link_oracle: Option<Arc<dyn LinkOracle>>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config: config.normalized(),
            progress_callback: None,
            link_oracle: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Consulted once, on the seed page. Validated suggestions jump the queue.
    pub fn with_link_oracle(mut self, oracle: Arc<dyn LinkOracle>) -> Self {
        self.link_oracle = Some(oracle);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn crawl(&self, seed_url: &str) -> Result<CrawlOutcome> {
        let started_at = Utc::now();

        let seed = normalize_url(seed_url)
            .ok_or_else(|| ScanError::InvalidUrl(format!("Invalid URL: {}", seed_url)))?;
        let host = Url::parse(&seed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| ScanError::InvalidUrl(format!("URL has no host: {}", seed)))?;
        let base_domain = registrable_domain(&host);

        info!(
            "Starting crawl of {} (domain {}) with {} workers, max {} pages",
            seed, base_domain, self.config.concurrency, self.config.max_pages
        );

        let fetcher = Fetcher::new(&self.config)?
            .with_rate_limiter(RateLimiter::per_second(self.config.requests_per_second));

        let gate = PolitenessGate::load(&fetcher, &seed, &self.config.user_agent).await;
        if !gate.can_fetch(&seed) {
            if self.config.respect_robots {
                return Err(ScanError::BlockedBySeedRobots(seed));
            }
            warn!("robots.txt disallows {}, crawling anyway", seed);
        }
        let site_info = gate.site_info(&fetcher, &seed).await;

        let ctx = WorkerContext {
            config: Arc::new(self.config.clone()),
            fetcher,
            gate: self.config.respect_robots.then(|| Arc::new(gate)),
            seed: Arc::from(seed.as_str()),
            base_domain: Arc::from(base_domain.as_str()),
            frontier: Arc::new(Mutex::new(Frontier::seeded(&seed))),
            results: Arc::new(Mutex::new(BTreeMap::new())),
            graph: Arc::new(Mutex::new(LinkGraph::new())),
            counters: Arc::new(CrawlCounters::default()),
            progress_callback: self.progress_callback.clone(),
            link_oracle: self.link_oracle.clone(),
            cancel: self.cancel.clone(),
        };

        let mut worker_handles = Vec::with_capacity(self.config.concurrency);
        for worker_id in 0..self.config.concurrency.max(1) {
            let ctx = ctx.clone();
            worker_handles.push(tokio::spawn(async move { run_worker(worker_id, ctx).await }));
        }

        for handle in worker_handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        let results = std::mem::take(&mut *ctx.results.lock().await);
        let graph = std::mem::take(&mut *ctx.graph.lock().await);
        let page_cap_reached = ctx.frontier.lock().await.cap_reached;
        let stats = ctx.counters.snapshot(started_at, Utc::now());

        if results.is_empty() {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled(seed));
            }
            return Err(ScanError::ZeroPagesCrawled(seed));
        }

        info!(
            "Crawl complete: {} crawled, {} failed, {} blocked by robots.txt in {:.2}s",
            stats.crawled, stats.failed, stats.blocked_by_robots, stats.duration_secs
        );

        Ok(CrawlOutcome {
            seed,
            base_domain,
            results,
            graph,
            stats,
            site_info,
            page_cap_reached,
        })
    }
}

async fn run_worker(worker_id: usize, ctx: WorkerContext) {
    debug!("Worker {} started", worker_id);
    let max_pages = ctx.config.max_pages;
    let mut idle_since: Option<Instant> = None;

    loop {
        if ctx.cancel.is_cancelled() {
            debug!("Worker {} cancelled", worker_id);
            break;
        }

        let next = {
            let mut frontier = ctx.frontier.lock().await;
            frontier.next(max_pages, ctx.gate.as_deref())
        };

        let target = match next {
            Next::Fetch(target) => target,
            Next::Skip => continue,
            Next::Blocked(url) => {
                info!("Blocked by robots.txt: {}", url);
                ctx.counters.record_blocked();
                continue;
            }
            Next::Stop => {
                info!("Reached maximum page limit ({})", max_pages);
                break;
            }
            Next::Drained => break,
            Next::Idle => {
                let since = idle_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= ctx.config.idle_timeout {
                    debug!("Worker {} idle for {:?}, exiting", worker_id, since.elapsed());
                    break;
                }
                tokio::select! {
                    _ = ctx.cancel.cancelled() => {}
                    _ = tokio::time::sleep(ctx.config.poll_interval) => {}
                }
                continue;
            }
        };
        idle_since = None;

        let depth = target.depth;
        let outcome = AssertUnwindSafe(process_target(worker_id, &ctx, target))
            .catch_unwind()
            .await;

        let (priority, links) = match outcome {
            Ok(discovered) => discovered,
            Err(_) => {
                error!("Worker {} panicked while processing a page", worker_id);
                ctx.counters.record_failed();
                (Vec::new(), Vec::new())
            }
        };

        ctx.frontier
            .lock()
            .await
            .complete(depth, priority, links, max_pages);
    }

    debug!("Worker {} finished", worker_id);
}

/// Fetches one page and records it. Returns (priority links, ordinary links) to enqueue.
async fn process_target(
    worker_id: usize,
    ctx: &WorkerContext,
    target: CrawlTarget,
) -> (Vec<String>, Vec<String>) {
    if let Some(ref callback) = ctx.progress_callback {
        callback(worker_id, target.url.clone());
    }

    let Some(mut page) = ctx.fetcher.fetch(&target.url).await else {
        ctx.counters.record_failed();
        ctx.graph.lock().await.add_node(&target.url);
        return (Vec::new(), Vec::new());
    };
    page.depth = target.depth;

    let links = if page.status_code == 200 && page.may_contain_links() {
        extract_internal_links(&page.body, &page.final_url, &ctx.base_domain)
    } else {
        Default::default()
    };

    {
        let mut graph = ctx.graph.lock().await;
        graph.add_node(&target.url);
        for link in &links {
            graph.add_edge(&target.url, link);
        }
    }

    let priority = if *ctx.seed == target.url && page.status_code == 200 {
        consult_oracle(ctx, &page).await
    } else {
        Vec::new()
    };

    let crawled = ctx.counters.record_crawled();
    debug!(
        "[Worker {}] {} -> {} ({} links, {} crawled)",
        worker_id,
        target.url,
        page.status_code,
        links.len(),
        crawled
    );

    ctx.results.lock().await.insert(target.url, page);
    (priority, links.into_iter().collect())
}

async fn consult_oracle(ctx: &WorkerContext, page: &PageResult) -> Vec<String> {
    let Some(ref oracle) = ctx.link_oracle else {
        return Vec::new();
    };

    match oracle.suggest_links(&page.body, &page.final_url).await {
        Ok(suggestions) => {
            let accepted =
                validate_suggestions(&page.body, &page.final_url, &ctx.base_domain, &suggestions);
            info!(
                "Link oracle suggested {} URLs, {} accepted",
                suggestions.len(),
                accepted.len()
            );
            accepted
        }
        Err(e) => {
            warn!("Link oracle failed, falling back to plain link extraction: {}", e);
            Vec::new()
        }
    }
}
