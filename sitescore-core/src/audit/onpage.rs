// On-page checks: title, meta description, H1, image alt text, internal links

use super::{PageAuditor, PageInput, element_text, meta_content};
use crate::error::Result;
use crate::finding::{Finding, Severity};
use scraper::{Html, Selector};
use sitescore_scanner::links::{extract_anchors, is_internal_link};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));

const TITLE_TEMPLATE_WORDS: &[&str] = &["home", "page", "untitled", "new page"];
/// Titles at least this long are never treated as template leftovers.
const TITLE_TEMPLATE_MAX_LEN: usize = 20;

/// Length thresholds, counted in characters.
#[derive(Debug, Clone)]
pub struct OnPageAuditor {
    pub title_range: RangeInclusive<usize>,
    pub description_range: RangeInclusive<usize>,
    pub max_internal_links: usize,
}

impl Default for OnPageAuditor {
    fn default() -> Self {
        Self {
            title_range: 30..=70,
            description_range: 120..=160,
            max_internal_links: 100,
        }
    }
}

impl OnPageAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed title text when a non-empty title exists.
    fn check_title(&self, document: &Html, findings: &mut Vec<Finding>) -> Option<String> {
        let Some(title) = document.select(&TITLE).next() else {
            findings.push(Finding::on_page("Title", Severity::Critical, "Missing title tag"));
            return None;
        };

        let text = element_text(&title);
        if text.is_empty() {
            findings.push(Finding::on_page("Title", Severity::Critical, "Title tag is empty"));
            return None;
        }

        let length = text.chars().count();
        let (min, max) = (*self.title_range.start(), *self.title_range.end());
        if length < min {
            findings.push(Finding::on_page(
                "Title",
                Severity::High,
                format!("Title too short ({} chars, recommended: {}-{})", length, min, max),
            ));
        } else if length > max {
            findings.push(Finding::on_page(
                "Title",
                Severity::Medium,
                format!("Title too long ({} chars, recommended: {}-{})", length, min, max),
            ));
        }

        let lower = text.to_lowercase();
        if length < TITLE_TEMPLATE_MAX_LEN && TITLE_TEMPLATE_WORDS.iter().any(|w| lower.contains(w)) {
            findings.push(Finding::on_page(
                "Title",
                Severity::Medium,
                "Title appears to be a template/default",
            ));
        }

        Some(text)
    }

    fn check_meta_description(&self, document: &Html, findings: &mut Vec<Finding>) {
        let Some(description) = meta_content(document, "description") else {
            findings.push(Finding::on_page(
                "Meta Description",
                Severity::High,
                "Missing meta description",
            ));
            return;
        };

        if description.is_empty() {
            findings.push(Finding::on_page(
                "Meta Description",
                Severity::High,
                "Meta description is empty",
            ));
            return;
        }

        let length = description.chars().count();
        let (min, max) = (*self.description_range.start(), *self.description_range.end());
        if length < min {
            findings.push(Finding::on_page(
                "Meta Description",
                Severity::Medium,
                format!("Meta description too short ({} chars, recommended: {}-{})", length, min, max),
            ));
        } else if length > max {
            findings.push(Finding::on_page(
                "Meta Description",
                Severity::Low,
                format!("Meta description too long ({} chars, recommended: {}-{})", length, min, max),
            ));
        }
    }

    fn check_h1(&self, document: &Html, title: Option<&str>, findings: &mut Vec<Finding>) {
        let headings: Vec<String> = document.select(&H1).map(|h| element_text(&h)).collect();

        match headings.len() {
            0 => findings.push(Finding::on_page("H1", Severity::High, "No H1 tag found")),
            1 => {}
            n => findings.push(Finding::on_page(
                "H1",
                Severity::Medium,
                format!("Multiple H1 tags found ({})", n),
            )),
        }

        if let Some(title) = title
            && headings
                .iter()
                .any(|h| !h.is_empty() && h.to_lowercase() == title.to_lowercase())
        {
            findings.push(Finding::on_page(
                "H1",
                Severity::Low,
                "H1 is identical to title tag (may indicate over-templating)",
            ));
        }
    }

    fn check_image_alt(&self, document: &Html, findings: &mut Vec<Finding>) {
        let mut missing = 0;
        let mut empty = 0;
        for img in document.select(&IMG) {
            match img.value().attr("alt") {
                None => missing += 1,
                Some("") => empty += 1,
                Some(_) => {}
            }
        }

        if missing > 0 {
            findings.push(Finding::on_page(
                "Image Alt",
                Severity::Medium,
                format!("{} image(s) missing alt attribute", missing),
            ));
        }
        if empty > 0 {
            findings.push(Finding::on_page(
                "Image Alt",
                Severity::Low,
                format!("{} image(s) with empty alt attribute", empty),
            ));
        }
    }

    fn check_internal_links(&self, page: &PageInput<'_>, findings: &mut Vec<Finding>) {
        let internal: Vec<_> = extract_anchors(page.html, page.final_url)
            .into_iter()
            .filter(|a| is_internal_link(&a.url, page.base_domain))
            .collect();

        let without_text: BTreeSet<&str> = internal
            .iter()
            .filter(|a| a.text.is_empty())
            .map(|a| a.url.as_str())
            .collect();
        for url in without_text {
            findings.push(Finding::on_page(
                "Internal Links",
                Severity::Low,
                format!("Link without anchor text: {}", url),
            ));
        }

        if internal.len() > self.max_internal_links {
            findings.push(Finding::on_page(
                "Internal Links",
                Severity::Low,
                format!(
                    "Excessive internal links ({}, recommended: <{})",
                    internal.len(),
                    self.max_internal_links
                ),
            ));
        }
    }
}

impl PageAuditor for OnPageAuditor {
    fn name(&self) -> &'static str {
        "on-page"
    }

    fn audit(&self, page: &PageInput<'_>) -> Result<Vec<Finding>> {
        if !page.has_html_body() {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(page.html);
        let mut findings = Vec::new();

        let title = self.check_title(&document, &mut findings);
        self.check_meta_description(&document, &mut findings);
        self.check_h1(&document, title.as_deref(), &mut findings);
        self.check_image_alt(&document, &mut findings);
        self.check_internal_links(page, &mut findings);

        Ok(findings)
    }
}
