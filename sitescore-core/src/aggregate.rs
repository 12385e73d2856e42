// Site-wide issue grouping and statistics

use crate::finding::{Category, Finding, Severity, SeverityCounts};
use crate::scoring::PageScore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::warn;

/// Messages whose tail is a per-instance value. The tail is kept as group detail.
const VARIABLE_SUFFIX_PREFIXES: &[&str] = &[
    "Link without anchor text:",
    "Canonical points to different URL:",
    "Server error:",
    "Audit failed:",
];

static LEADING_IMAGE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s+(image\(s\))").expect("valid regex"));
static MEASUREMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*(?:chars|recommended:)[^)]*\)").expect("valid regex"));
static RECOMMENDED_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*recommended:.*$").expect("valid regex"));
static RECOMMENDED_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(recommended:.*?\)").expect("valid regex"));
static LEADING_RESOURCE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+\s+(resource\(s\)|script\(s\)|stylesheet\(s\))").expect("valid regex")
});
static TRAILING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A message with its volatile parts removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub message: String,
    /// Variable suffix cut off the message, e.g. the URL of a link without anchor text.
    pub detail: Option<String>,
}

/// Strips counts, measurements and per-instance suffixes so equivalent
/// findings from different pages share one grouping key.
pub fn normalize_message(message: &str) -> NormalizedMessage {
    for prefix in VARIABLE_SUFFIX_PREFIXES {
        if let Some(rest) = message.strip_prefix(prefix) {
            let detail = rest.trim();
            return NormalizedMessage {
                message: prefix.trim_end_matches(':').to_string(),
                detail: (!detail.is_empty()).then(|| detail.to_string()),
            };
        }
    }

    let mut text = LEADING_IMAGE_COUNT.replace(message, "$1").into_owned();
    text = MEASUREMENT.replace_all(&text, "").into_owned();
    text = RECOMMENDED_TAIL.replace(&text, "").into_owned();
    text = RECOMMENDED_PAREN.replace_all(&text, "").into_owned();
    text = LEADING_RESOURCE_COUNT.replace(&text, "$1").into_owned();
    text = TRAILING_PAREN.replace(&text, "").into_owned();
    let text = WHITESPACE.replace_all(&text, " ").trim().to_string();

    NormalizedMessage {
        message: if text.is_empty() {
            message.to_string()
        } else {
            text
        },
        detail: None,
    }
}

/// One site-wide issue: every page reporting the same normalized finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueGroup {
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub affected_pages_count: usize,
    pub affected_pages: Vec<String>,
    /// Distinct per-instance values, e.g. link URLs missing anchor text.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<String>,
    /// Heaviest weight seen for this issue.
    pub weight: i32,
}

#[derive(Default)]
struct GroupAccumulator {
    severity: Option<Severity>,
    weight: i32,
    pages: BTreeSet<String>,
    details: BTreeSet<String>,
}

/// Merges every page's findings into unique issue groups, keyed by
/// `(category, type, normalized message)`. A page counts once per group.
///
/// Groups come back most severe first, then by affected page count
/// descending, then by message.
pub fn group_issues<'a, I>(pages: I) -> Vec<IssueGroup>
where
    I: IntoIterator<Item = (&'a str, &'a [Finding])>,
{
    let mut groups: BTreeMap<(Category, String, String), GroupAccumulator> = BTreeMap::new();

    for (url, findings) in pages {
        for finding in findings {
            let normalized = normalize_message(&finding.message);
            let acc = groups
                .entry((finding.category, finding.kind.clone(), normalized.message))
                .or_default();

            acc.severity = Some(match acc.severity {
                Some(current) => current.min(finding.severity),
                None => finding.severity,
            });
            if finding.weight.unsigned_abs() > acc.weight.unsigned_abs() {
                acc.weight = finding.weight;
            }
            acc.pages.insert(url.to_string());
            if let Some(detail) = normalized.detail {
                acc.details.insert(detail);
            }
        }
    }

    let mut issues: Vec<IssueGroup> = groups
        .into_iter()
        .map(|((category, kind, message), acc)| IssueGroup {
            category,
            kind,
            severity: acc.severity.unwrap_or(Severity::Low),
            message,
            affected_pages_count: acc.pages.len(),
            affected_pages: acc.pages.into_iter().collect(),
            details: acc.details.into_iter().collect(),
            weight: acc.weight,
        })
        .collect();

    issues.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then(b.affected_pages_count.cmp(&a.affected_pages_count))
            .then_with(|| a.message.cmp(&b.message))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.category.cmp(&b.category))
    });
    issues
}

/// Whole-site summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    pub total_pages: usize,
    /// Mean page score times the configured scale, rounded to 2 decimals. 0 without pages.
    pub average_score: f64,
    /// Number of unique issue groups, not occurrences.
    pub total_issues: usize,
    /// Raw finding occurrences across all pages.
    pub total_findings: usize,
    /// Occurrence counts by severity, summed over pages.
    pub severity_counts: SeverityCounts,
    /// Unique issue groups by severity.
    pub issue_counts: SeverityCounts,
}

/// Sums per-page results into site statistics. `issues` provides the unique-issue totals.
pub fn aggregate<'a, I>(scores: I, issues: &[IssueGroup], scale: f64) -> SiteStats
where
    I: IntoIterator<Item = &'a PageScore>,
{
    let mut stats = SiteStats::default();
    let mut score_sum: i64 = 0;

    for page in scores {
        stats.total_pages += 1;
        score_sum += i64::from(page.score);
        stats.total_findings += page.issue_count();
        stats.severity_counts.merge(&page.counts);
    }

    if stats.total_pages > 0 {
        let mean = score_sum as f64 / stats.total_pages as f64 * scale;
        stats.average_score = if mean.is_finite() {
            round2(mean)
        } else {
            warn!("Non-finite site average ({}), reporting 0", mean);
            0.0
        };
    }

    stats.total_issues = issues.len();
    for issue in issues {
        stats.issue_counts.add(issue.severity, 1);
    }

    stats
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(message: &str) -> String {
        normalize_message(message).message
    }

    #[test]
    fn test_normalize_measurements() {
        assert_eq!(norm("Title too short (18 chars, recommended: 30-70)"), "Title too short");
        assert_eq!(
            norm("Meta description too long (200 chars, recommended: 120-160)"),
            "Meta description too long"
        );
        assert_eq!(norm("Excessive internal links (140, recommended: <100)"), "Excessive internal links");
        assert_eq!(norm("Multiple H1 tags found (3)"), "Multiple H1 tags found");
        assert_eq!(norm("Redirect chain too long (4 hops)"), "Redirect chain too long");
        assert_eq!(norm("3 image(s) missing alt attribute"), "image(s) missing alt attribute");
        assert_eq!(norm("12 resource(s) loaded via HTTP"), "resource(s) loaded via HTTP");
        assert_eq!(norm("Missing   title tag"), "Missing title tag");
    }

    #[test]
    fn test_normalize_variable_suffix() {
        let n = normalize_message("Link without anchor text: https://ex.com/a");
        assert_eq!(n.message, "Link without anchor text");
        assert_eq!(n.detail.as_deref(), Some("https://ex.com/a"));

        let n = normalize_message("Server error: 503");
        assert_eq!(n.message, "Server error");
        assert_eq!(n.detail.as_deref(), Some("503"));
    }

    #[test]
    fn test_normalize_keeps_original_when_everything_is_stripped() {
        assert_eq!(norm("(12 chars)"), "(12 chars)");
    }

    #[test]
    fn test_group_dedupes_pages_and_collects_details() {
        let a = vec![
            Finding::on_page("Internal Links", Severity::Low, "Link without anchor text: https://ex.com/x"),
            Finding::on_page("Internal Links", Severity::Low, "Link without anchor text: https://ex.com/y"),
        ];
        let b = vec![Finding::on_page(
            "Internal Links",
            Severity::Low,
            "Link without anchor text: https://ex.com/x",
        )];
        let groups = group_issues([("https://ex.com/a", a.as_slice()), ("https://ex.com/b", b.as_slice())]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].affected_pages_count, 2);
        assert_eq!(groups[0].details, vec!["https://ex.com/x", "https://ex.com/y"]);
    }

    #[test]
    fn test_group_takes_most_severe() {
        let a = vec![Finding::technical("Canonical", Severity::Medium, "Missing canonical tag")];
        let b = vec![Finding::technical("Canonical", Severity::High, "Missing canonical tag")];
        let groups = group_issues([("u1", a.as_slice()), ("u2", b.as_slice())]);
        assert_eq!(groups[0].severity, Severity::High);
    }

    #[test]
    fn test_same_message_different_type_stays_apart() {
        let a = vec![
            Finding::technical("Canonical", Severity::Low, "Something"),
            Finding::on_page("Title", Severity::Low, "Something"),
        ];
        assert_eq!(group_issues([("u", a.as_slice())]).len(), 2);
    }

    #[test]
    fn test_aggregate_empty() {
        let stats = aggregate(std::iter::empty(), &[], 1.0);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.average_score, 0.0);
    }

    #[test]
    fn test_aggregate_rounds_mean() {
        let page = |score| PageScore {
            score,
            findings: Vec::new(),
            counts: SeverityCounts::default(),
        };
        let pages = vec![page(100), page(90), page(91)];
        let stats = aggregate(&pages, &[], 1.0);
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.average_score, 93.67);

        let scaled = aggregate(&pages, &[], 0.7);
        assert_eq!(scaled.average_score, 65.57);
    }
}
