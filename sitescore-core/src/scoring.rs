// Issue-key classification, weights and per-page scoring

use crate::finding::{Finding, SeverityCounts};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

/// Weight-table key for a class of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKey {
    // Technical
    NoindexOnIndexable,
    NofollowDirective,
    MetaRobotsConflict,
    #[serde(rename = "canonical_404")]
    Canonical404,
    CanonicalToHomepage,
    CanonicalOther,
    #[serde(rename = "redirect_chain_404")]
    RedirectChain404,
    RedirectLoop,
    RedirectChainTooLong,
    #[serde(rename = "redirect_302_temporary")]
    Redirect302Temporary,
    RedirectOther,
    ServerError,
    MixedContentJsCss,
    NotHttps,
    MissingStructuredData,
    DuplicateStructuredData,
    // On-page
    MissingTitle,
    TitleEmpty,
    TitleTooShort,
    TitleTooLong,
    TitleTemplateDefault,
    DuplicateTitle,
    MissingMetaDescription,
    MetaDescriptionEmpty,
    MetaDescriptionTooShort,
    MetaDescriptionTooLong,
    DuplicateDescription,
    NoH1,
    MultipleH1,
    H1IdenticalToTitle,
    DuplicateH1,
    H1Other,
    ImagesMissingAlt,
    ImagesEmptyAlt,
    BrokenInternalLinks,
    ExcessiveInternalLinks,
    LinkWithoutAnchorText,
    InternalLinksOther,
    OrphanPage,
    // Fallbacks
    AuditFailure,
    Unclassified,
}

impl IssueKey {
    pub const ALL: [IssueKey; 41] = [
        IssueKey::NoindexOnIndexable,
        IssueKey::NofollowDirective,
        IssueKey::MetaRobotsConflict,
        IssueKey::Canonical404,
        IssueKey::CanonicalToHomepage,
        IssueKey::CanonicalOther,
        IssueKey::RedirectChain404,
        IssueKey::RedirectLoop,
        IssueKey::RedirectChainTooLong,
        IssueKey::Redirect302Temporary,
        IssueKey::RedirectOther,
        IssueKey::ServerError,
        IssueKey::MixedContentJsCss,
        IssueKey::NotHttps,
        IssueKey::MissingStructuredData,
        IssueKey::DuplicateStructuredData,
        IssueKey::MissingTitle,
        IssueKey::TitleEmpty,
        IssueKey::TitleTooShort,
        IssueKey::TitleTooLong,
        IssueKey::TitleTemplateDefault,
        IssueKey::DuplicateTitle,
        IssueKey::MissingMetaDescription,
        IssueKey::MetaDescriptionEmpty,
        IssueKey::MetaDescriptionTooShort,
        IssueKey::MetaDescriptionTooLong,
        IssueKey::DuplicateDescription,
        IssueKey::NoH1,
        IssueKey::MultipleH1,
        IssueKey::H1IdenticalToTitle,
        IssueKey::DuplicateH1,
        IssueKey::H1Other,
        IssueKey::ImagesMissingAlt,
        IssueKey::ImagesEmptyAlt,
        IssueKey::BrokenInternalLinks,
        IssueKey::ExcessiveInternalLinks,
        IssueKey::LinkWithoutAnchorText,
        IssueKey::InternalLinksOther,
        IssueKey::OrphanPage,
        IssueKey::AuditFailure,
        IssueKey::Unclassified,
    ];

    pub fn default_weight(&self) -> i32 {
        match self {
            IssueKey::NoindexOnIndexable => -15,
            IssueKey::NofollowDirective => -3,
            IssueKey::MetaRobotsConflict => -6,
            IssueKey::Canonical404 => -12,
            IssueKey::CanonicalToHomepage => -12,
            IssueKey::CanonicalOther => -6,
            IssueKey::RedirectChain404 => -12,
            IssueKey::RedirectLoop => -15,
            IssueKey::RedirectChainTooLong => -6,
            IssueKey::Redirect302Temporary => -4,
            IssueKey::RedirectOther => -6,
            IssueKey::ServerError => -12,
            IssueKey::MixedContentJsCss => -10,
            IssueKey::NotHttps => -15,
            IssueKey::MissingStructuredData => -2,
            IssueKey::DuplicateStructuredData => -2,
            IssueKey::MissingTitle => -8,
            IssueKey::TitleEmpty => -8,
            IssueKey::TitleTooShort => -4,
            IssueKey::TitleTooLong => -4,
            IssueKey::TitleTemplateDefault => -3,
            IssueKey::DuplicateTitle => -4,
            IssueKey::MissingMetaDescription => -6,
            IssueKey::MetaDescriptionEmpty => -6,
            IssueKey::MetaDescriptionTooShort => -3,
            IssueKey::MetaDescriptionTooLong => -3,
            IssueKey::DuplicateDescription => -2,
            IssueKey::NoH1 => -6,
            IssueKey::MultipleH1 => -4,
            IssueKey::H1IdenticalToTitle => -2,
            IssueKey::DuplicateH1 => -2,
            IssueKey::H1Other => -3,
            IssueKey::ImagesMissingAlt => -4,
            IssueKey::ImagesEmptyAlt => -2,
            IssueKey::BrokenInternalLinks => -4,
            IssueKey::ExcessiveInternalLinks => -2,
            IssueKey::LinkWithoutAnchorText => -2,
            IssueKey::InternalLinksOther => -2,
            IssueKey::OrphanPage => -6,
            IssueKey::AuditFailure => -2,
            IssueKey::Unclassified => -2,
        }
    }

    /// Upper bound on the per-finding multiplier for count-bearing issues.
    fn count_cap(&self) -> Option<i32> {
        match self {
            IssueKey::ImagesMissingAlt => Some(3),
            IssueKey::ImagesEmptyAlt => Some(2),
            _ => None,
        }
    }
}

/// Maps a finding's `(type, message)` to its weight key.
///
/// Checks run in a fixed order per type, so "Title tag is empty" is never
/// read as "Missing title tag" and re-classifying is always stable.
pub fn classify(kind: &str, message: &str) -> IssueKey {
    let m = message.to_lowercase();
    let has = |needle: &str| m.contains(needle);

    match kind {
        "Audit" => IssueKey::AuditFailure,
        "Noindex" => IssueKey::NoindexOnIndexable,
        "Nofollow" => IssueKey::NofollowDirective,
        "Meta Robots" => {
            if has("conflict") {
                IssueKey::MetaRobotsConflict
            } else if has("noindex") {
                IssueKey::NoindexOnIndexable
            } else {
                IssueKey::NofollowDirective
            }
        }
        "Canonical" => {
            if has("404") {
                IssueKey::Canonical404
            } else if has("homepage") {
                IssueKey::CanonicalToHomepage
            } else {
                IssueKey::CanonicalOther
            }
        }
        "Redirects" => {
            if has("404") {
                IssueKey::RedirectChain404
            } else if has("loop") {
                IssueKey::RedirectLoop
            } else if has("too long") {
                IssueKey::RedirectChainTooLong
            } else if has("302") || has("temporary") {
                IssueKey::Redirect302Temporary
            } else if has("error") {
                IssueKey::ServerError
            } else {
                IssueKey::RedirectOther
            }
        }
        "HTTPS" => IssueKey::NotHttps,
        "Mixed Content" => IssueKey::MixedContentJsCss,
        "Structured Data" => {
            if has("duplicate") {
                IssueKey::DuplicateStructuredData
            } else {
                IssueKey::MissingStructuredData
            }
        }
        "Title" => {
            if has("missing") {
                IssueKey::MissingTitle
            } else if has("empty") {
                IssueKey::TitleEmpty
            } else if has("too short") {
                IssueKey::TitleTooShort
            } else if has("too long") {
                IssueKey::TitleTooLong
            } else if has("template") || has("default") {
                IssueKey::TitleTemplateDefault
            } else if has("duplicate") {
                IssueKey::DuplicateTitle
            } else {
                IssueKey::TitleTooShort
            }
        }
        "Meta Description" => {
            if has("missing") {
                IssueKey::MissingMetaDescription
            } else if has("empty") {
                IssueKey::MetaDescriptionEmpty
            } else if has("too short") {
                IssueKey::MetaDescriptionTooShort
            } else if has("too long") {
                IssueKey::MetaDescriptionTooLong
            } else if has("duplicate") {
                IssueKey::DuplicateDescription
            } else {
                IssueKey::MetaDescriptionTooShort
            }
        }
        "H1" => {
            if has("multiple") {
                IssueKey::MultipleH1
            } else if has("identical") || has("same as title") {
                IssueKey::H1IdenticalToTitle
            } else if has("duplicate") {
                IssueKey::DuplicateH1
            } else if m.starts_with("no h1") {
                IssueKey::NoH1
            } else {
                IssueKey::H1Other
            }
        }
        "Image Alt" => {
            if has("empty") {
                IssueKey::ImagesEmptyAlt
            } else {
                IssueKey::ImagesMissingAlt
            }
        }
        "Internal Links" => {
            if has("orphan") {
                IssueKey::OrphanPage
            } else if has("broken") {
                IssueKey::BrokenInternalLinks
            } else if has("excessive") || has("too many") {
                IssueKey::ExcessiveInternalLinks
            } else if has("anchor text") {
                IssueKey::LinkWithoutAnchorText
            } else {
                IssueKey::InternalLinksOther
            }
        }
        _ => IssueKey::Unclassified,
    }
}

/// Leading integer of a message such as "3 image(s) missing alt attribute".
fn leading_count(message: &str) -> Option<i32> {
    message.split_whitespace().next()?.parse().ok()
}

/// Scoring knobs. Weights missing from `weights` fall back to the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: i32,
    pub score_floor: i32,
    /// Multiplier applied to the site mean. 1.0 leaves it unscaled.
    pub site_score_scale: f64,
    pub weights: BTreeMap<IssueKey, i32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 100,
            score_floor: 20,
            site_score_scale: 1.0,
            weights: IssueKey::ALL
                .iter()
                .map(|key| (*key, key.default_weight()))
                .collect(),
        }
    }
}

impl ScoringConfig {
    pub fn weight(&self, key: IssueKey) -> i32 {
        self.weights
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_weight())
    }

    pub fn with_weight(mut self, key: IssueKey, weight: i32) -> Self {
        self.weights.insert(key, weight);
        self
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Score and display order for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScore {
    pub score: i32,
    pub findings: Vec<Finding>,
    pub counts: SeverityCounts,
}

impl PageScore {
    pub fn issue_count(&self) -> usize {
        self.findings.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Weight a finding should carry: its key's weight, times the affected
    /// count for count-bearing issues.
    pub fn weigh(&self, finding: &Finding) -> i32 {
        let key = classify(&finding.kind, &finding.message);
        let weight = self.config.weight(key);
        match key.count_cap() {
            Some(cap) => weight * leading_count(&finding.message).unwrap_or(1).clamp(1, cap),
            None => weight,
        }
    }

    pub fn assign_weights(&self, findings: &mut [Finding]) {
        for finding in findings.iter_mut() {
            finding.weight = self.weigh(finding);
        }
    }

    /// Sums the findings' weights onto the base score and clamps at the floor.
    /// Findings come back ordered most severe first, heaviest first within a tier.
    pub fn score_page(&self, findings: &[Finding]) -> PageScore {
        let delta: i64 = findings.iter().map(|f| i64::from(f.weight)).sum();
        let raw = i64::from(self.config.base_score) + delta;
        let score = raw
            .min(i64::from(self.config.base_score))
            .max(i64::from(self.config.score_floor));

        let mut sorted = findings.to_vec();
        sort_findings(&mut sorted);

        debug!("Scored {} findings: {} -> {}", findings.len(), raw, score);

        PageScore {
            score: score as i32,
            counts: SeverityCounts::from_findings(&sorted),
            findings: sorted,
        }
    }
}

/// Stable sort by severity rank, then by absolute weight, largest first.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by_key(|f| (f.severity.rank(), Reverse(f.weight.unsigned_abs())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;

    #[test]
    fn test_classify_title_variants() {
        assert_eq!(classify("Title", "Missing title tag"), IssueKey::MissingTitle);
        assert_eq!(classify("Title", "Title tag is empty"), IssueKey::TitleEmpty);
        assert_eq!(
            classify("Title", "Title too short (18 chars, recommended: 30-70)"),
            IssueKey::TitleTooShort
        );
        assert_eq!(
            classify("Title", "Title too long (90 chars, recommended: 30-70)"),
            IssueKey::TitleTooLong
        );
        assert_eq!(
            classify("Title", "Title appears to be a template/default"),
            IssueKey::TitleTemplateDefault
        );
        assert_eq!(classify("Title", "Duplicate title tag"), IssueKey::DuplicateTitle);
    }

    #[test]
    fn test_classify_redirects_in_priority_order() {
        assert_eq!(
            classify("Redirects", "Redirect chain ends in 404"),
            IssueKey::RedirectChain404
        );
        assert_eq!(classify("Redirects", "Redirect loop detected"), IssueKey::RedirectLoop);
        assert_eq!(
            classify("Redirects", "Redirect chain too long (4 hops)"),
            IssueKey::RedirectChainTooLong
        );
        assert_eq!(
            classify("Redirects", "Uses 302 (temporary) redirect instead of 301"),
            IssueKey::Redirect302Temporary
        );
        assert_eq!(classify("Redirects", "Server error: 503"), IssueKey::ServerError);
    }

    #[test]
    fn test_classify_h1_and_links() {
        assert_eq!(classify("H1", "No H1 tag found"), IssueKey::NoH1);
        assert_eq!(classify("H1", "Multiple H1 tags found (3)"), IssueKey::MultipleH1);
        assert_eq!(classify("H1", "Duplicate H1 heading"), IssueKey::DuplicateH1);
        assert_eq!(
            classify("Internal Links", "Orphan page (no internal in-links)"),
            IssueKey::OrphanPage
        );
        assert_eq!(
            classify("Internal Links", "Link without anchor text: https://ex.com/a"),
            IssueKey::LinkWithoutAnchorText
        );
        assert_eq!(classify("Something Else", "whatever"), IssueKey::Unclassified);
    }

    #[test]
    fn test_image_alt_weight_is_capped_multiple() {
        let engine = ScoringEngine::default();
        let many = Finding::on_page("Image Alt", Severity::Medium, "7 image(s) missing alt attribute");
        let one = Finding::on_page("Image Alt", Severity::Medium, "1 image(s) missing alt attribute");
        let empty = Finding::on_page("Image Alt", Severity::Low, "5 image(s) with empty alt attribute");
        assert_eq!(engine.weigh(&many), -12);
        assert_eq!(engine.weigh(&one), -4);
        assert_eq!(engine.weigh(&empty), -4);
    }

    #[test]
    fn test_score_and_order() {
        let engine = ScoringEngine::default();
        let findings = vec![
            Finding::on_page("Title", Severity::Medium, "b").with_weight(-4),
            Finding::on_page("Title", Severity::High, "a").with_weight(-8),
        ];
        let page = engine.score_page(&findings);
        assert_eq!(page.score, 88);
        assert_eq!(page.findings[0].weight, -8);
        assert_eq!(page.counts.high, 1);
        assert_eq!(page.counts.medium, 1);
    }

    #[test]
    fn test_heavier_first_within_tier() {
        let engine = ScoringEngine::default();
        let findings = vec![
            Finding::technical("Canonical", Severity::High, "light").with_weight(-2),
            Finding::technical("Canonical", Severity::High, "heavy").with_weight(-12),
            Finding::technical("HTTPS", Severity::Critical, "crit").with_weight(-1),
        ];
        let page = engine.score_page(&findings);
        let order: Vec<_> = page.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(order, vec!["crit", "heavy", "light"]);
    }

    #[test]
    fn test_floor() {
        let engine = ScoringEngine::default();
        let findings: Vec<_> = (0..50)
            .map(|i| Finding::technical("HTTPS", Severity::Critical, format!("{}", i)).with_weight(-15))
            .collect();
        assert_eq!(engine.score_page(&findings).score, 20);
    }

    #[test]
    fn test_partial_weight_override() {
        let config = ScoringConfig::from_json(r#"{"weights": {"missing_title": -20}}"#).unwrap();
        assert_eq!(config.weight(IssueKey::MissingTitle), -20);
        assert_eq!(config.weight(IssueKey::NoH1), -6);
        assert_eq!(config.base_score, 100);
        assert_eq!(config.score_floor, 20);
    }

    #[test]
    fn test_keys_use_table_names() {
        let json = serde_json::to_string(&IssueKey::RedirectChain404).unwrap();
        assert_eq!(json, "\"redirect_chain_404\"");
        let key: IssueKey = serde_json::from_str("\"h1_identical_to_title\"").unwrap();
        assert_eq!(key, IssueKey::H1IdenticalToTitle);
    }
}
