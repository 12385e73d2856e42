// Technical checks: indexing directives, canonical, redirects, HTTPS, structured data

use super::{PageAuditor, PageInput};
use crate::error::Result;
use crate::finding::{Finding, Severity};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use sitescore_scanner::links::normalize_url;
use sitescore_scanner::result::is_redirect_loop;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static META_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("valid selector"));
static LINK_REL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel]").expect("valid selector"));
static IMG_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));
static SCRIPT_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("valid selector"));
static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector"));
static MICRODATA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope][itemtype]").expect("valid selector"));
static RDFA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[typeof]").expect("valid selector"));

/// Longest redirect chain, in entries, that is not reported.
const MAX_CHAIN_ENTRIES: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct TechnicalAuditor;

impl TechnicalAuditor {
    pub fn new() -> Self {
        Self
    }

    fn check_robots_directives(&self, document: &Html, page: &PageInput<'_>, findings: &mut Vec<Finding>) {
        let meta = document
            .select(&META_NAME)
            .find(|m| {
                m.value().attr("name").is_some_and(|n| {
                    let n = n.to_ascii_lowercase();
                    n.contains("robots") || n.contains("googlebot")
                })
            })
            .map(|m| m.value().attr("content").unwrap_or("").to_ascii_lowercase());
        let header = page
            .header("x-robots-tag")
            .map(str::to_ascii_lowercase)
            .filter(|h| !h.is_empty());

        let meta_noindex = meta.as_deref().is_some_and(|c| c.contains("noindex"));
        let header_noindex = header.as_deref().is_some_and(|h| h.contains("noindex"));
        let nofollow = meta.as_deref().is_some_and(|c| c.contains("nofollow"))
            || header.as_deref().is_some_and(|h| h.contains("nofollow"));

        if meta_noindex || header_noindex {
            findings.push(Finding::technical(
                "Noindex",
                Severity::Critical,
                "Page has noindex directive",
            ));
        }
        if nofollow {
            findings.push(Finding::technical(
                "Nofollow",
                Severity::Medium,
                "Page has nofollow directive",
            ));
        }
        if meta.is_some() && header.is_some() && meta_noindex != header_noindex {
            findings.push(Finding::technical(
                "Meta Robots",
                Severity::High,
                "Conflict between meta robots tag and X-Robots-Tag header",
            ));
        }
    }

    fn check_canonical(&self, document: &Html, page: &PageInput<'_>, findings: &mut Vec<Finding>) {
        let canonical = document.select(&LINK_REL).find(|link| {
            link.value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
        });

        let Some(canonical) = canonical else {
            findings.push(Finding::technical("Canonical", Severity::High, "Missing canonical tag"));
            return;
        };

        let href = canonical.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            findings.push(Finding::technical(
                "Canonical",
                Severity::High,
                "Canonical tag has empty href",
            ));
            return;
        }

        let Ok(page_url) = Url::parse(page.final_url) else {
            return;
        };
        let Ok(target) = page_url.join(href) else {
            findings.push(Finding::technical(
                "Canonical",
                Severity::Medium,
                format!("Canonical points to different URL: {}", href),
            ));
            return;
        };

        if target.path() == "/" && page_url.path() != "/" {
            findings.push(Finding::technical(
                "Canonical",
                Severity::Critical,
                "Canonical points to homepage instead of current page",
            ));
        } else if normalize_url(target.as_str()) != normalize_url(page_url.as_str()) {
            findings.push(Finding::technical(
                "Canonical",
                Severity::Medium,
                format!("Canonical points to different URL: {}", href),
            ));
        }
    }

    fn check_redirects(&self, page: &PageInput<'_>, findings: &mut Vec<Finding>) {
        let temporary = page.status_code == 302 || page.redirect_statuses.contains(&302);
        if temporary {
            findings.push(Finding::technical(
                "Redirects",
                Severity::Medium,
                "Uses 302 (temporary) redirect instead of 301",
            ));
        }

        match page.status_code {
            404 if page.redirect_chain.is_empty() => findings.push(Finding::technical(
                "Redirects",
                Severity::Critical,
                "Page returns 404",
            )),
            404 => findings.push(Finding::technical(
                "Redirects",
                Severity::Critical,
                "Redirect chain ends in 404",
            )),
            code if code >= 500 => findings.push(Finding::technical(
                "Redirects",
                Severity::Critical,
                format!("Server error: {}", code),
            )),
            _ => {}
        }

        if is_redirect_loop(page.redirect_chain) {
            findings.push(Finding::technical(
                "Redirects",
                Severity::Critical,
                "Redirect loop detected",
            ));
        } else if page.redirect_chain.len() > MAX_CHAIN_ENTRIES {
            findings.push(Finding::technical(
                "Redirects",
                Severity::High,
                format!(
                    "Redirect chain too long ({} hops)",
                    page.redirect_chain.len().saturating_sub(1)
                ),
            ));
        }
    }

    fn check_https(&self, document: Option<&Html>, page: &PageInput<'_>, findings: &mut Vec<Finding>) {
        let is_https = Url::parse(page.final_url).is_ok_and(|u| u.scheme() == "https");
        if !is_https {
            findings.push(Finding::technical(
                "HTTPS",
                Severity::Critical,
                "Page not served over HTTPS",
            ));
            return;
        }

        let Some(document) = document else {
            return;
        };
        let insecure = |value: Option<&str>| value.is_some_and(|v| v.trim().starts_with("http://"));

        let images = document
            .select(&IMG_SRC)
            .filter(|e| insecure(e.value().attr("src")))
            .count();
        let scripts = document
            .select(&SCRIPT_SRC)
            .filter(|e| insecure(e.value().attr("src")))
            .count();
        let stylesheets = document
            .select(&LINK_REL)
            .filter(|e| {
                e.value()
                    .attr("rel")
                    .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
                    && insecure(e.value().attr("href"))
            })
            .count();

        let mixed = images + scripts + stylesheets;
        if mixed > 0 {
            findings.push(Finding::technical(
                "Mixed Content",
                Severity::High,
                format!("{} resource(s) loaded via HTTP", mixed),
            ));
        }
    }

    fn check_structured_data(&self, document: &Html, findings: &mut Vec<Finding>) {
        let mut json_ld_types = Vec::new();
        let mut invalid_blocks = 0;

        for script in document.select(&JSON_LD) {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => collect_ld_types(&value, &mut json_ld_types),
                Err(_) => invalid_blocks += 1,
            }
        }

        let other_types = document
            .select(&MICRODATA)
            .chain(document.select(&RDFA))
            .filter(|e| schema_attr(e).is_some())
            .count();

        if invalid_blocks > 0 {
            findings.push(Finding::technical(
                "Structured Data",
                Severity::Medium,
                format!("Invalid JSON-LD structured data ({} block(s))", invalid_blocks),
            ));
        }

        let mut seen = HashSet::new();
        if json_ld_types.iter().any(|t| !seen.insert(t.as_str())) {
            findings.push(Finding::technical(
                "Structured Data",
                Severity::Medium,
                "Duplicate structured data types detected",
            ));
        }

        if json_ld_types.is_empty() && other_types == 0 && invalid_blocks == 0 {
            findings.push(Finding::technical(
                "Structured Data",
                Severity::Low,
                "No structured data found",
            ));
        }
    }
}

fn schema_attr<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    element
        .value()
        .attr("itemtype")
        .or_else(|| element.value().attr("typeof"))
        .filter(|t| !t.trim().is_empty())
}

/// `@type` values of a JSON-LD document, descending into arrays and `@graph`.
fn collect_ld_types(value: &Value, types: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_ld_types(item, types)),
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => types.push(t.clone()),
                Some(Value::Array(ts)) => {
                    let joined: Vec<&str> = ts.iter().filter_map(Value::as_str).collect();
                    if !joined.is_empty() {
                        types.push(joined.join(","));
                    }
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_ld_types(graph, types);
            }
        }
        _ => {}
    }
}

impl PageAuditor for TechnicalAuditor {
    fn name(&self) -> &'static str {
        "technical"
    }

    fn audit(&self, page: &PageInput<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.check_redirects(page, &mut findings);

        if page.has_html_body() {
            let document = Html::parse_document(page.html);
            self.check_robots_directives(&document, page, &mut findings);
            self.check_canonical(&document, page, &mut findings);
            self.check_https(Some(&document), page, &mut findings);
            self.check_structured_data(&document, &mut findings);
        } else {
            self.check_https(None, page, &mut findings);
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitescore_scanner::PageResult;

    fn page(url: &str, html: &str) -> PageResult {
        let mut page = PageResult::new(url.to_string());
        page.status_code = 200;
        page.body = html.to_string();
        page.headers.insert("content-type".into(), "text/html".into());
        page
    }

    fn messages(page: &PageResult) -> Vec<String> {
        TechnicalAuditor::new()
            .audit(&PageInput::from_page(page, "ex.com"))
            .unwrap()
            .into_iter()
            .map(|f| f.message)
            .collect()
    }

    const CLEAN_HEAD: &str = r#"<link rel="canonical" href="https://ex.com/a">
        <script type="application/ld+json">{"@context":"https://schema.org","@type":"Organization"}</script>"#;

    #[test]
    fn test_clean_page_has_no_findings() {
        let p = page("https://ex.com/a", &format!("<html><head>{}</head></html>", CLEAN_HEAD));
        assert!(messages(&p).is_empty());
    }

    #[test]
    fn test_noindex_and_conflict() {
        let mut p = page(
            "https://ex.com/a",
            &format!(r#"<html><head>{}<meta name="robots" content="noindex, nofollow"></head></html>"#, CLEAN_HEAD),
        );
        p.headers.insert("x-robots-tag".into(), "all".into());
        let found = messages(&p);
        assert!(found.contains(&"Page has noindex directive".to_string()));
        assert!(found.contains(&"Page has nofollow directive".to_string()));
        assert!(found.contains(&"Conflict between meta robots tag and X-Robots-Tag header".to_string()));
    }

    #[test]
    fn test_canonical_variants() {
        let missing = page("https://ex.com/a", "<html></html>");
        assert!(messages(&missing).contains(&"Missing canonical tag".to_string()));

        let home = page(
            "https://ex.com/deep/page",
            r#"<html><head><link rel="canonical" href="/"></head></html>"#,
        );
        let found = messages(&home);
        assert!(found.contains(&"Canonical points to homepage instead of current page".to_string()));
        assert!(!found.iter().any(|m| m.starts_with("Canonical points to different URL")));

        let other = page(
            "https://ex.com/a",
            r#"<html><head><link rel="canonical" href="https://ex.com/b"></head></html>"#,
        );
        assert!(messages(&other).contains(&"Canonical points to different URL: https://ex.com/b".to_string()));

        let relative_self = page(
            "https://ex.com/a/",
            r#"<html><head><link rel="canonical" href="/a"></head></html>"#,
        );
        assert!(!messages(&relative_self).iter().any(|m| m.starts_with("Canonical")));
    }

    #[test]
    fn test_redirect_findings() {
        let mut p = page("https://ex.com/x", "");
        p.final_url = "https://ex.com/z".into();
        p.redirect_chain = vec!["https://ex.com/x".into(), "https://ex.com/y".into(), "https://ex.com/z".into()];
        p.redirect_statuses = vec![301, 302];
        p.status_code = 404;
        let found = messages(&p);
        assert!(found.contains(&"Uses 302 (temporary) redirect instead of 301".to_string()));
        assert!(found.contains(&"Redirect chain ends in 404".to_string()));
        assert!(found.contains(&"Redirect chain too long (2 hops)".to_string()));

        let mut looped = page("https://ex.com/x", "");
        looped.redirect_chain = vec!["https://ex.com/x".into(), "https://ex.com/y".into(), "https://ex.com/x".into()];
        looped.status_code = 301;
        let found = messages(&looped);
        assert!(found.contains(&"Redirect loop detected".to_string()));
        assert!(!found.iter().any(|m| m.contains("too long")));

        let mut single = page("https://ex.com/x", "");
        single.redirect_chain = vec!["https://ex.com/x".into(), "https://ex.com/y".into()];
        single.redirect_statuses = vec![301];
        assert!(!messages(&single).iter().any(|m| m.contains("too long")));

        let mut broken = page("https://ex.com/x", "");
        broken.status_code = 503;
        assert!(messages(&broken).contains(&"Server error: 503".to_string()));
    }

    #[test]
    fn test_https_and_mixed_content() {
        let plain = page("http://ex.com/a", &format!("<html><head>{}</head></html>", CLEAN_HEAD));
        assert!(messages(&plain).contains(&"Page not served over HTTPS".to_string()));

        let mixed = page(
            "https://ex.com/a",
            &format!(
                r#"<html><head>{}<link rel="stylesheet" href="http://cdn.ex.com/a.css">
                <script src="http://cdn.ex.com/a.js"></script></head>
                <body><img src="http://cdn.ex.com/a.png" alt="a"><img src="https://ok/b.png" alt="b"></body></html>"#,
                CLEAN_HEAD
            ),
        );
        assert!(messages(&mixed).contains(&"3 resource(s) loaded via HTTP".to_string()));
    }

    #[test]
    fn test_structured_data() {
        let none = page(
            "https://ex.com/a",
            r#"<html><head><link rel="canonical" href="https://ex.com/a"></head></html>"#,
        );
        assert_eq!(messages(&none), vec!["No structured data found"]);

        let dup = page(
            "https://ex.com/a",
            r#"<html><head><link rel="canonical" href="https://ex.com/a">
            <script type="application/ld+json">{"@graph":[{"@type":"Article"},{"@type":"Article"}]}</script>
            </head></html>"#,
        );
        assert_eq!(messages(&dup), vec!["Duplicate structured data types detected"]);

        let microdata = page(
            "https://ex.com/a",
            r#"<html><head><link rel="canonical" href="https://ex.com/a"></head>
            <body><div itemscope itemtype="https://schema.org/Product"></div></body></html>"#,
        );
        assert!(messages(&microdata).is_empty());

        let invalid = page(
            "https://ex.com/a",
            r#"<html><head><link rel="canonical" href="https://ex.com/a">
            <script type="application/ld+json">{not json</script></head></html>"#,
        );
        assert_eq!(messages(&invalid), vec!["Invalid JSON-LD structured data (1 block(s))"]);
    }
}
