//! Optional link-suggestion oracle.
//!
//! An oracle (for example an LLM-backed extractor) may name the "important"
//! pages of a site so the crawler visits them first. Its answers are never
//! trusted: [`validate_suggestions`] keeps only URLs that actually appear as
//! an anchor on the page and belong to the crawl's domain.

use crate::links::{extract_anchors, is_internal_link, normalize_url};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

#[async_trait]
pub trait LinkOracle: Send + Sync {
    /// Suggest absolute URLs worth crawling from `html`, served at `page_url`.
    async fn suggest_links(&self, html: &str, page_url: &str) -> anyhow::Result<Vec<String>>;
}

/// Drops every suggestion that is not an internal anchor href on the page.
/// Survivors are normalized and returned in suggestion order, without duplicates.
pub fn validate_suggestions(
    html: &str,
    page_url: &str,
    base_domain: &str,
    suggestions: &[String],
) -> Vec<String> {
    let anchors: HashSet<String> = extract_anchors(html, page_url)
        .into_iter()
        .map(|anchor| anchor.url)
        .collect();

    let mut seen = BTreeSet::new();
    let mut accepted = Vec::new();
    for suggestion in suggestions {
        let Some(normalized) = normalize_url(suggestion) else {
            debug!("Dropping unparseable suggestion {:?}", suggestion);
            continue;
        };
        if !anchors.contains(&normalized) {
            debug!("Dropping suggestion not present on page: {}", normalized);
            continue;
        }
        if !is_internal_link(&normalized, base_domain) {
            debug!("Dropping external suggestion: {}", normalized);
            continue;
        }
        if seen.insert(normalized.clone()) {
            accepted.push(normalized);
        }
    }
    accepted
}
