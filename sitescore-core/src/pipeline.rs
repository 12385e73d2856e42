//! Crawl, audit, score and aggregate one site.
//!
//! [`AuditPipeline::analyze`] is synchronous and deterministic: given the same
//! [`CrawlOutcome`] it always produces the same report, whatever order the
//! crawl workers happened to finish in.

use crate::aggregate::{aggregate, group_issues};
use crate::audit::{OnPageAuditor, PageAuditor, PageInput, PageSignals, TechnicalAuditor, run_auditors};
use crate::duplicates::DuplicateIndex;
use crate::error::Result;
use crate::finding::{Finding, Severity};
use crate::report::{AuditReport, PageReport};
use crate::scoring::{ScoringConfig, ScoringEngine};
use chrono::Utc;
use sitescore_scanner::{CrawlConfig, CrawlOutcome, Crawler, LinkOracle, ProgressCallback};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const ORPHAN_MESSAGE: &str = "Orphan page (no internal in-links)";

pub fn default_auditors() -> Vec<Box<dyn PageAuditor>> {
    vec![Box::new(TechnicalAuditor::new()), Box::new(OnPageAuditor::new())]
}

pub struct AuditPipeline {
    crawl_config: CrawlConfig,
    engine: ScoringEngine,
    auditors: Vec<Box<dyn PageAuditor>>,
    progress_callback: Option<ProgressCallback>,
    link_oracle: Option<Arc<dyn LinkOracle>>,
    cancellation: Option<CancellationToken>,
}

impl AuditPipeline {
    pub fn new(crawl_config: CrawlConfig, scoring: ScoringConfig) -> Self {
        Self {
            crawl_config,
            engine: ScoringEngine::new(scoring),
            auditors: default_auditors(),
            progress_callback: None,
            link_oracle: None,
            cancellation: None,
        }
    }

    /// Replaces the built-in auditors.
    pub fn with_auditors(mut self, auditors: Vec<Box<dyn PageAuditor>>) -> Self {
        self.auditors = auditors;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_link_oracle(mut self, oracle: Arc<dyn LinkOracle>) -> Self {
        self.link_oracle = Some(oracle);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    fn crawler(&self) -> Crawler {
        let mut crawler = Crawler::new(self.crawl_config.clone());
        if let Some(ref callback) = self.progress_callback {
            crawler = crawler.with_progress_callback(callback.clone());
        }
        if let Some(ref oracle) = self.link_oracle {
            crawler = crawler.with_link_oracle(oracle.clone());
        }
        if let Some(ref token) = self.cancellation {
            crawler = crawler.with_cancellation(token.clone());
        }
        crawler
    }

    pub async fn run(&self, url: &str) -> Result<AuditReport> {
        info!("Starting audit of {}", url);
        let outcome = self.crawler().crawl(url).await?;
        let report = self.analyze(&outcome);
        info!(
            "Audit of {} complete: {} pages, site score {:.2}, {} unique issues",
            report.base_url,
            report.site_stats.total_pages,
            report.site_stats.average_score,
            report.site_stats.total_issues
        );
        Ok(report)
    }

    /// Turns a finished crawl into a scored report.
    pub fn analyze(&self, outcome: &CrawlOutcome) -> AuditReport {
        let mut findings: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
        let mut duplicates = DuplicateIndex::new();

        for (url, page) in &outcome.results {
            let input = PageInput::from_page(page, &outcome.base_domain);
            findings.insert(url.clone(), run_auditors(&self.auditors, &input));
            if input.has_html_body() {
                duplicates.record(url, &PageSignals::extract(&page.body));
            }
        }

        for (url, mut found) in duplicates.findings() {
            if let Some(page_findings) = findings.get_mut(&url) {
                page_findings.append(&mut found);
            }
        }

        let orphans = outcome.graph.find_orphans(outcome.results.keys());
        for orphan in &orphans {
            if let Some(page_findings) = findings.get_mut(orphan) {
                page_findings.push(Finding::on_page("Internal Links", Severity::High, ORPHAN_MESSAGE));
            }
        }
        debug!("{} orphan pages", orphans.len());

        for (url, count) in broken_link_counts(outcome) {
            if let Some(page_findings) = findings.get_mut(&url) {
                page_findings.push(Finding::on_page(
                    "Internal Links",
                    Severity::Medium,
                    format!("Broken internal links ({})", count),
                ));
            }
        }

        let mut pages = Vec::with_capacity(findings.len());
        for (url, mut page_findings) in findings {
            let Some(page) = outcome.results.get(&url) else {
                continue;
            };
            self.engine.assign_weights(&mut page_findings);
            let score = self.engine.score_page(&page_findings);
            debug!("{} scored {} ({} findings)", url, score.score, score.issue_count());

            pages.push(PageReport {
                in_links: outcome.graph.in_degree(&url),
                final_url: page.final_url.clone(),
                status_code: page.status_code,
                depth: page.depth,
                redirect_chain: page.redirect_chain.clone(),
                url,
                score,
            });
        }

        let issues = group_issues(
            pages
                .iter()
                .map(|p| (p.url.as_str(), p.score.findings.as_slice())),
        );
        let site_stats = aggregate(
            pages.iter().map(|p| &p.score),
            &issues,
            self.engine.config().site_score_scale,
        );

        AuditReport {
            base_url: outcome.seed.clone(),
            base_domain: outcome.base_domain.clone(),
            generated_at: Utc::now(),
            crawl_stats: outcome.stats.clone(),
            site_info: outcome.site_info.clone(),
            site_stats,
            pages,
            issues,
            duplicates: duplicates.report(),
            orphans: orphans.into_iter().collect(),
            page_cap_reached: outcome.page_cap_reached,
        }
    }
}

/// Number of distinct crawled pages returning >= 400 that each page links to.
fn broken_link_counts(outcome: &CrawlOutcome) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (url, page) in &outcome.results {
        if page.status_code < 400 {
            continue;
        }
        for referrer in outcome.graph.referrers(url) {
            if referrer != *url && outcome.results.contains_key(&referrer) {
                *counts.entry(referrer).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Crawls `url` with the built-in auditors and returns the scored report.
pub async fn run_audit(url: &str, crawl: CrawlConfig, scoring: ScoringConfig) -> Result<AuditReport> {
    AuditPipeline::new(crawl, scoring).run(url).await
}
