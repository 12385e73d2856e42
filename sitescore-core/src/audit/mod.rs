//! Page auditors: pluggable checks that turn one fetched page into findings.
//!
//! Auditors never fail a run. [`run_auditors`] converts an auditor error or
//! panic into an `Audit` finding on that page and carries on with the rest.

pub mod onpage;
pub mod technical;

pub use onpage::OnPageAuditor;
pub use technical::TechnicalAuditor;

use crate::error::Result;
use crate::finding::{Finding, Severity};
use scraper::{Html, Selector};
use sitescore_scanner::PageResult;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("valid selector"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

/// Read-only view of a fetched page handed to auditors.
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    pub url: &'a str,
    pub final_url: &'a str,
    pub html: &'a str,
    pub status_code: u16,
    pub headers: &'a BTreeMap<String, String>,
    pub redirect_chain: &'a [String],
    pub redirect_statuses: &'a [u16],
    /// Registrable domain of the crawl, for internal-link checks.
    pub base_domain: &'a str,
}

impl<'a> PageInput<'a> {
    pub fn from_page(page: &'a PageResult, base_domain: &'a str) -> Self {
        Self {
            url: &page.url,
            final_url: &page.final_url,
            html: &page.body,
            status_code: page.status_code,
            headers: &page.headers,
            redirect_chain: &page.redirect_chain,
            redirect_statuses: &page.redirect_statuses,
            base_domain,
        }
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for a 200 response whose content type is HTML or absent.
    pub fn has_html_body(&self) -> bool {
        self.status_code == 200
            && self
                .header("content-type")
                .map(|ct| ct.contains("html"))
                .unwrap_or(true)
    }
}

pub trait PageAuditor: Send + Sync {
    fn name(&self) -> &'static str;

    fn audit(&self, page: &PageInput<'_>) -> Result<Vec<Finding>>;
}

/// Runs every auditor over one page. A failing auditor yields an `Audit` finding.
pub fn run_auditors(auditors: &[Box<dyn PageAuditor>], page: &PageInput<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for auditor in auditors {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| auditor.audit(page)));
        match outcome {
            Ok(Ok(mut found)) => {
                debug!("{} auditor: {} findings on {}", auditor.name(), found.len(), page.url);
                findings.append(&mut found);
            }
            Ok(Err(e)) => {
                warn!("{} auditor failed on {}: {}", auditor.name(), page.url, e);
                findings.push(audit_failure(auditor.name(), &e.to_string()));
            }
            Err(_) => {
                warn!("{} auditor panicked on {}", auditor.name(), page.url);
                findings.push(audit_failure(auditor.name(), "auditor panicked"));
            }
        }
    }

    findings
}

fn audit_failure(auditor: &str, reason: &str) -> Finding {
    Finding::technical(
        "Audit",
        Severity::Low,
        format!("Audit failed: {} ({})", auditor, reason),
    )
}

/// Text signals used for whole-crawl duplicate detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
}

impl PageSignals {
    pub fn extract(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            title: non_empty(document.select(&TITLE_SELECTOR).next().map(|t| element_text(&t))),
            meta_description: non_empty(meta_content(&document, "description")),
            h1: non_empty(document.select(&H1_SELECTOR).next().map(|h| element_text(&h))),
        }
    }
}

/// Trimmed text of an element with inner whitespace collapsed.
pub(crate) fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `content` of the first `<meta name=...>` whose name equals `name`, ignoring case.
pub(crate) fn meta_content(document: &Html, name: &str) -> Option<String> {
    document
        .select(&META_NAME_SELECTOR)
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .map(|meta| meta.value().attr("content").unwrap_or("").trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;

    struct Failing;
    impl PageAuditor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn audit(&self, _page: &PageInput<'_>) -> Result<Vec<Finding>> {
            Err(AuditError::Parse("bad markup".into()))
        }
    }

    struct Panicking;
    impl PageAuditor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn audit(&self, _page: &PageInput<'_>) -> Result<Vec<Finding>> {
            panic!("boom")
        }
    }

    struct Fixed;
    impl PageAuditor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn audit(&self, _page: &PageInput<'_>) -> Result<Vec<Finding>> {
            Ok(vec![Finding::on_page("H1", Severity::High, "No H1 tag found")])
        }
    }

    #[test]
    fn test_failures_become_findings() {
        let page = PageResult::new("https://ex.com/".into());
        let input = PageInput::from_page(&page, "ex.com");
        let auditors: Vec<Box<dyn PageAuditor>> =
            vec![Box::new(Failing), Box::new(Panicking), Box::new(Fixed)];

        let findings = run_auditors(&auditors, &input);

        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].kind, "Audit");
        assert!(findings[0].message.contains("failing"));
        assert_eq!(findings[1].kind, "Audit");
        assert_eq!(findings[2].message, "No H1 tag found");
    }

    #[test]
    fn test_extract_signals() {
        let html = r#"<html><head><title>  Blue   Widgets </title>
            <meta name="Description" content=" Best widgets. "></head>
            <body><h1>Widgets</h1><h1>Second</h1></body></html>"#;
        let signals = PageSignals::extract(html);
        assert_eq!(signals.title.as_deref(), Some("Blue Widgets"));
        assert_eq!(signals.meta_description.as_deref(), Some("Best widgets."));
        assert_eq!(signals.h1.as_deref(), Some("Widgets"));

        assert_eq!(PageSignals::extract("<html></html>"), PageSignals::default());
    }
}
