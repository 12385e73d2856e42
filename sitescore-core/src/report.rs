// Audit report model and its text / JSON renderers

use crate::aggregate::{IssueGroup, SiteStats};
use crate::duplicates::DuplicateReport;
use crate::finding::Severity;
use crate::scoring::PageScore;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use sitescore_scanner::{CrawlStats, SiteInfo};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

/// Issue groups listed in the text summary before it truncates.
const TEXT_ISSUE_LIMIT: usize = 25;
/// Affected URLs listed per issue group in the text summary.
const TEXT_PAGE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (expected text or json)", other)),
        }
    }
}

/// One audited page, as handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub redirect_chain: Vec<String>,
    /// Internal pages linking here.
    pub in_links: usize,
    #[serde(flatten)]
    pub score: PageScore,
}

/// Fully resolved result of one audit run. All collections are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub base_url: String,
    pub base_domain: String,
    pub generated_at: DateTime<Utc>,
    pub crawl_stats: CrawlStats,
    pub site_info: SiteInfo,
    pub site_stats: SiteStats,
    /// Sorted by URL.
    pub pages: Vec<PageReport>,
    pub issues: Vec<IssueGroup>,
    pub duplicates: DuplicateReport,
    pub orphans: Vec<String>,
    pub page_cap_reached: bool,
}

impl AuditReport {
    pub fn page(&self, url: &str) -> Option<&PageReport> {
        self.pages
            .binary_search_by(|p| p.url.as_str().cmp(url))
            .ok()
            .map(|i| &self.pages[i])
    }

    /// Lowest scoring pages first, ties by URL.
    pub fn worst_pages(&self, n: usize) -> Vec<&PageReport> {
        let mut pages: Vec<&PageReport> = self.pages.iter().collect();
        pages.sort_by(|a, b| a.score.score.cmp(&b.score.score).then_with(|| a.url.cmp(&b.url)));
        pages.truncate(n);
        pages
    }
}

pub fn render(report: &AuditReport, format: ReportFormat, color: bool) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report, color)),
        ReportFormat::Json => generate_json_report(report),
    }
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> ColoredString) -> String {
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn severity_label(severity: Severity, color: bool) -> String {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    let label = format!("{:<10}", label);
    paint(&label, color, |s| match severity {
        Severity::Critical => s.red().bold(),
        Severity::High => s.bright_red(),
        Severity::Medium => s.yellow(),
        Severity::Low => s.bright_black(),
    })
}

fn score_label(score: f64, color: bool) -> String {
    let text = format!("{:.2}", score);
    paint(&text, color, |s| {
        if score >= 80.0 {
            s.green().bold()
        } else if score >= 50.0 {
            s.yellow().bold()
        } else {
            s.red().bold()
        }
    })
}

fn status_label(status: u16, color: bool) -> String {
    let text = if status == 0 { "---".to_string() } else { status.to_string() };
    paint(&text, color, |s| match status {
        200..=299 => s.green(),
        300..=399 => s.cyan(),
        400..=499 => s.yellow(),
        500..=599 => s.red(),
        _ => s.white(),
    })
}

fn section(report: &mut String, title: &str, color: bool) {
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&paint(title, color, |s| s.bold()));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Human readable summary. `color` toggles ANSI styling.
pub fn generate_text_report(data: &AuditReport, color: bool) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&paint("                           SITESCORE SEO AUDIT REPORT", color, |s| s.bold()));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    let stats = &data.crawl_stats;
    report.push_str(&format!("Site:          {}\n", data.base_url));
    report.push_str(&format!("Domain:        {}\n", data.base_domain));
    report.push_str(&format!("Audit Date:    {}\n", data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    report.push_str(&format!("Duration:      {:.1} seconds\n", stats.duration_secs));
    report.push_str(&format!(
        "Pages:         {} crawled, {} failed, {} blocked by robots.txt\n",
        stats.crawled, stats.failed, stats.blocked_by_robots
    ));
    if data.page_cap_reached {
        report.push_str("               (page limit reached, site may have more pages)\n");
    }
    report.push_str(&format!("robots.txt:    {}\n", yes_no(data.site_info.robots_exists)));
    report.push_str(&format!("llms.txt:      {}\n", yes_no(data.site_info.llms_exists)));
    if data.site_info.sitemap_urls.is_empty() {
        report.push_str("Sitemaps:      none found\n");
    } else {
        for (i, sitemap) in data.site_info.sitemap_urls.iter().enumerate() {
            let label = if i == 0 { "Sitemaps:" } else { "" };
            report.push_str(&format!("{:<15}{}\n", label, sitemap));
        }
    }
    report.push('\n');

    section(&mut report, "SUMMARY", color);
    let site = &data.site_stats;
    report.push_str(&format!("Site Score:     {} / 100\n", score_label(site.average_score, color)));
    report.push_str(&format!("Pages Audited:  {}\n", site.total_pages));
    report.push_str(&format!(
        "Unique Issues:  {}  ({} occurrences)\n\n",
        site.total_issues, site.total_findings
    ));
    for severity in Severity::all() {
        let count = site.issue_counts.get(severity);
        if count > 0 {
            report.push_str(&format!(
                "  {} {}  ({} occurrences)\n",
                severity_label(severity, color),
                count,
                site.severity_counts.get(severity)
            ));
        }
    }
    report.push('\n');

    if !data.issues.is_empty() {
        section(&mut report, "ISSUES", color);
        for (idx, issue) in data.issues.iter().take(TEXT_ISSUE_LIMIT).enumerate() {
            report.push_str(&format!(
                "[{}] {} {}\n",
                idx + 1,
                severity_label(issue.severity, color),
                issue.message
            ));
            report.push_str(&format!("    {} / {}  weight {}\n", issue.category, issue.kind, issue.weight));
            report.push_str(&format!("    Affected pages: {}\n", issue.affected_pages_count));
            for url in issue.affected_pages.iter().take(TEXT_PAGE_LIMIT) {
                report.push_str(&format!("      {}\n", url));
            }
            if issue.affected_pages.len() > TEXT_PAGE_LIMIT {
                report.push_str(&format!(
                    "      ... and {} more\n",
                    issue.affected_pages.len() - TEXT_PAGE_LIMIT
                ));
            }
            if !issue.details.is_empty() {
                report.push_str(&format!("    Details: {}\n", issue.details.len()));
                for detail in issue.details.iter().take(TEXT_PAGE_LIMIT) {
                    report.push_str(&format!("      {}\n", detail));
                }
            }
            report.push('\n');
        }
        if data.issues.len() > TEXT_ISSUE_LIMIT {
            report.push_str(&format!(
                "... {} more issues in the JSON report\n\n",
                data.issues.len() - TEXT_ISSUE_LIMIT
            ));
        }
    }

    if !data.pages.is_empty() {
        section(&mut report, "PAGES", color);
        for page in &data.pages {
            report.push_str(&format!(
                "  {} {:>3}  {}  ({} issues)\n",
                status_label(page.status_code, color),
                page.score.score,
                page.url,
                page.score.issue_count()
            ));
        }
        report.push('\n');
    }

    if !data.orphans.is_empty() || !data.duplicates.is_empty() {
        section(&mut report, "SITE STRUCTURE", color);
        if !data.orphans.is_empty() {
            report.push_str(&format!("Orphan pages ({}):\n", data.orphans.len()));
            for orphan in &data.orphans {
                report.push_str(&format!("  {}\n", orphan));
            }
            report.push('\n');
        }

        let duplicate_sets = [
            ("Duplicate titles", &data.duplicates.titles),
            ("Duplicate meta descriptions", &data.duplicates.meta_descriptions),
            ("Duplicate H1 headings", &data.duplicates.h1s),
        ];
        for (label, groups) in duplicate_sets {
            if groups.is_empty() {
                continue;
            }
            report.push_str(&format!("{} ({}):\n", label, groups.len()));
            for group in groups {
                report.push_str(&format!("  \"{}\"\n", group.text));
                for url in &group.urls {
                    report.push_str(&format!("    {}\n", url));
                }
            }
            report.push('\n');
        }
        report.push_str(THIN_RULE);
        report.push_str("\n\n");
    }

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                                End of Report\n");
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("\nGenerated by SiteScore v{}\n\n", env!("CARGO_PKG_VERSION")));

    report
}

pub fn generate_json_report(data: &AuditReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "metadata": {
            "generator": "SiteScore",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": data.generated_at.to_rfc3339(),
            "format": "json",
        },
        "report": data,
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
