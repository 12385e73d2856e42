// Link extraction and URL helpers shared by the crawler and the auditors

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Second-level labels that country-code registries sell domains under,
/// as in `example.com.au` or `example.or.jp`.
const GENERIC_SECOND_LEVELS: &[&str] = &[
    "ac", "co", "com", "edu", "gob", "go", "gov", "ltd", "mil", "ne", "net", "nic", "nom",
    "or", "org", "plc", "sch",
];

/// Two-level public suffixes that do not follow the generic pattern.
const IRREGULAR_TWO_LEVEL_SUFFIXES: &[&str] = &[
    "me.uk", "asn.au", "id.au", "gen.nz", "kiwi.nz", "school.nz", "ad.jp", "gr.jp", "lg.jp",
    "art.br", "eng.br", "ind.br", "in.th", "biz.pl", "info.pl",
];

/// Whether `second.tld` is itself a public suffix, so registrations sit one level deeper.
fn is_two_level_suffix(second: &str, tld: &str) -> bool {
    let is_country_code = tld.len() == 2 && tld.bytes().all(|b| b.is_ascii_alphabetic());
    if is_country_code && GENERIC_SECOND_LEVELS.contains(&second) {
        return true;
    }
    IRREGULAR_TWO_LEVEL_SUFFIXES.contains(&format!("{}.{}", second, tld).as_str())
}

/// An `<a href>` on a page, resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub url: String,
    pub text: String,
}

/// Drops the fragment, lowercases scheme and host, strips a trailing slash off non-root paths.
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    Some(parsed.to_string())
}

/// Registrable domain of a host, e.g. `blog.example.co.uk` -> `example.co.uk`.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if is_two_level_suffix(second, tld) { 3 } else { 2 };
    labels[labels.len() - keep..].join(".")
}

/// Registrable domain of a full URL.
pub fn url_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(registrable_domain))
}

pub fn is_internal_link(url: &str, base_domain: &str) -> bool {
    url_domain(url).is_some_and(|domain| domain == base_domain)
}

/// Resolves `href` against `base`, skipping non-navigational schemes and bare fragments.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
        || href.starts_with('#')
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    normalize_url(resolved.as_str())
}

/// Every resolvable anchor on the page, in document order.
pub fn extract_anchors(html: &str, page_url: &str) -> Vec<Anchor> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_url(&base, href)?;
            let text = element.text().collect::<String>().trim().to_string();
            Some(Anchor { url, text })
        })
        .collect()
}

/// Distinct internal links on a page. `final_url` is the post-redirect URL.
pub fn extract_internal_links(html: &str, final_url: &str, base_domain: &str) -> BTreeSet<String> {
    let mut links = BTreeSet::new();
    for anchor in extract_anchors(html, final_url) {
        if is_internal_link(&anchor.url, base_domain) {
            links.insert(anchor.url);
        } else {
            debug!("Skipping external link {} (base domain {})", anchor.url, base_domain);
        }
    }
    links
}

/// Returns the path component of a URL, `/` for the root.
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}
