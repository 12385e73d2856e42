// Tests for site-wide issue grouping

use sitescore_core::aggregate::{aggregate, group_issues, normalize_message};
use sitescore_core::finding::{Finding, Severity};
use sitescore_core::scoring::{ScoringConfig, ScoringEngine};
use std::collections::BTreeSet;

#[test]
fn test_title_too_short_groups_across_pages() {
    let a = vec![Finding::on_page(
        "Title",
        Severity::High,
        "Title too short (18 chars, recommended: 30-70)",
    )];
    let b = vec![Finding::on_page(
        "Title",
        Severity::High,
        "Title too short (10 chars, recommended: 30-70)",
    )];

    let groups = group_issues([("https://ex.com/a", a.as_slice()), ("https://ex.com/b", b.as_slice())]);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].message, "Title too short");
    assert_eq!(groups[0].affected_pages_count, 2);
    assert_eq!(groups[0].affected_pages, vec!["https://ex.com/a", "https://ex.com/b"]);
}

#[test]
fn test_group_count_equals_distinct_keys() {
    let pages: Vec<(String, Vec<Finding>)> = (0..6)
        .map(|i| {
            let mut findings = vec![
                Finding::on_page("H1", Severity::High, "No H1 tag found"),
                Finding::on_page("Image Alt", Severity::Medium, format!("{} image(s) missing alt attribute", i + 1)),
                Finding::technical("Redirects", Severity::High, format!("Redirect chain too long ({} hops)", i + 2)),
            ];
            if i % 2 == 0 {
                findings.push(Finding::on_page(
                    "Internal Links",
                    Severity::Low,
                    format!("Link without anchor text: https://ex.com/{}", i),
                ));
            }
            (format!("https://ex.com/p{}", i), findings)
        })
        .collect();

    let groups = group_issues(pages.iter().map(|(u, f)| (u.as_str(), f.as_slice())));

    let distinct: BTreeSet<_> = pages
        .iter()
        .flat_map(|(_, findings)| findings.iter())
        .map(|f| (f.category, f.kind.clone(), normalize_message(&f.message).message))
        .collect();
    assert_eq!(groups.len(), distinct.len());
    assert_eq!(groups.len(), 4);

    let anchors = groups
        .iter()
        .find(|g| g.message == "Link without anchor text")
        .unwrap();
    assert_eq!(anchors.affected_pages_count, 3);
    assert_eq!(anchors.details.len(), 3);
}

#[test]
fn test_groups_sorted_by_severity_then_reach() {
    let a = vec![
        Finding::on_page("Image Alt", Severity::Low, "1 image(s) with empty alt attribute"),
        Finding::on_page("Title", Severity::Medium, "Title too long (80 chars, recommended: 30-70)"),
        Finding::technical("Canonical", Severity::Medium, "Missing canonical tag"),
    ];
    let b = vec![Finding::technical("Canonical", Severity::Medium, "Missing canonical tag")];
    let c = vec![Finding::technical("HTTPS", Severity::Critical, "Page not served over HTTPS")];

    let groups = group_issues([("a", a.as_slice()), ("b", b.as_slice()), ("c", c.as_slice())]);
    let order: Vec<_> = groups.iter().map(|g| g.message.as_str()).collect();

    assert_eq!(
        order,
        vec![
            "Page not served over HTTPS",
            "Missing canonical tag",
            "Title too long",
            "image(s) with empty alt attribute",
        ]
    );
}

#[test]
fn test_aggregate_from_scored_pages() {
    let engine = ScoringEngine::new(ScoringConfig::default());
    let mut a = vec![Finding::on_page("Title", Severity::Critical, "Missing title tag")];
    let mut b = vec![
        Finding::on_page("Title", Severity::Critical, "Missing title tag"),
        Finding::on_page("H1", Severity::High, "No H1 tag found"),
    ];
    engine.assign_weights(&mut a);
    engine.assign_weights(&mut b);
    let scores = vec![engine.score_page(&a), engine.score_page(&b)];

    let issues = group_issues([("a", scores[0].findings.as_slice()), ("b", scores[1].findings.as_slice())]);
    let stats = aggregate(&scores, &issues, 1.0);

    // (92 + 86) / 2
    assert_eq!(stats.average_score, 89.0);
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.total_issues, 2);
    assert_eq!(stats.total_findings, 3);
    assert_eq!(stats.severity_counts.critical, 2);
    assert_eq!(stats.issue_counts.critical, 1);
    assert_eq!(stats.issue_counts.high, 1);
}
