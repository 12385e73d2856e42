use crate::config::{CrawlConfig, RetryPolicy};
use crate::error::{Result, ScanError};
use crate::rate_limit::RateLimiter;
use crate::result::PageResult;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Single-page HTTP GET with timeout, retry and redirect-chain capture.
///
/// Redirects are followed by hand so every hop is recorded in order.
/// 4xx/5xx responses come back as ordinary pages; only network-level
/// failures are retried.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    max_redirects: usize,
    limiter: Option<RateLimiter>,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            max_redirects: config.max_redirects,
            limiter: None,
        })
    }

    /// Every attempt, retries included, waits on this limiter first.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch and swallow the error. `None` means the URL failed after all retries.
    pub async fn fetch(&self, url: &str) -> Option<PageResult> {
        match self.try_fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Giving up on {}: {}", url, e);
                None
            }
        }
    }

    pub async fn try_fetch(&self, url: &str) -> Result<PageResult> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(ref limiter) = self.limiter {
                limiter.acquire().await;
            }

            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Transient error fetching {} (attempt {}/{}): {}. Retrying in {:?}",
                        url, attempt, self.retry.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<PageResult> {
        let start = Instant::now();
        let mut current =
            Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut chain: Vec<String> = Vec::new();
        let mut hop_statuses: Vec<u16> = Vec::new();

        loop {
            debug!("GET {}", current);
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            let next = if status.is_redirection() {
                redirect_target(&current, response.headers())
            } else {
                None
            };

            let Some(next) = next else {
                return Self::into_page(url, current.as_str(), (chain, hop_statuses), response, start)
                    .await;
            };

            if chain.is_empty() {
                chain.push(current.to_string());
            }
            let looped = chain.iter().any(|hop| hop == next.as_str());
            chain.push(next.to_string());
            hop_statuses.push(status.as_u16());

            if looped {
                warn!("Redirect loop detected at {}", next);
                return Self::into_page(url, next.as_str(), (chain, hop_statuses), response, start)
                    .await;
            }
            if chain.len() > self.max_redirects {
                warn!("Stopped following redirects from {} after {} hops", url, chain.len() - 1);
                return Self::into_page(url, next.as_str(), (chain, hop_statuses), response, start)
                    .await;
            }

            current = next;
        }
    }

    async fn into_page(
        requested: &str,
        final_url: &str,
        (redirect_chain, redirect_statuses): (Vec<String>, Vec<u16>),
        response: Response,
        start: Instant,
    ) -> Result<PageResult> {
        let status_code = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.text().await?;

        let mut page = PageResult::new(requested.to_string());
        page.final_url = final_url.to_string();
        page.status_code = status_code;
        page.headers = headers;
        page.body = body;
        page.redirect_chain = redirect_chain;
        page.redirect_statuses = redirect_statuses;
        page.fetch_duration = start.elapsed();
        Ok(page)
    }

    /// Body of `url` when it finally answers 200, following redirects the same
    /// way page fetches do. `None` for any other status or failure.
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        if let Some(ref limiter) = self.limiter {
            limiter.acquire().await;
        }

        match self.fetch_once(url).await {
            Ok(page) if page.status_code == 200 => {
                if page.was_redirected() {
                    debug!("{} redirected to {}", url, page.final_url);
                }
                Some(page.body)
            }
            Ok(page) => {
                debug!("{} returned status {}", url, page.status_code);
                None
            }
            Err(e) => {
                debug!("Could not fetch {}: {}", url, e);
                None
            }
        }
    }
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    let mut next = current.join(location.trim()).ok()?;
    next.set_fragment(None);
    Some(next)
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}
