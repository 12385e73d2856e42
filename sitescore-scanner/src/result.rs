use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

const NON_MARKUP_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "font/",
    "application/pdf",
    "application/octet-stream",
    "application/zip",
];

/// A frontier entry. `depth` is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: usize,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// One fetched page, stored under the URL that was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
    /// Every hop in request order, ending with the final URL. Empty when no redirect happened.
    pub redirect_chain: Vec<String>,
    /// Status code of each redirect response, in hop order.
    #[serde(default)]
    pub redirect_statuses: Vec<u16>,
    pub fetch_duration: Duration,
    pub depth: usize,
}

impl PageResult {
    pub fn new(url: String) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status_code: 0,
            body: String::new(),
            headers: BTreeMap::new(),
            redirect_chain: Vec::new(),
            redirect_statuses: Vec::new(),
            fetch_duration: Duration::from_secs(0),
            depth: 0,
        }
    }

    /// Case-insensitive header lookup; header names are stored lowercased.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// False only for content types that are clearly not markup. A missing or
    /// mislabelled Content-Type still gets its links parsed.
    pub fn may_contain_links(&self) -> bool {
        let Some(content_type) = self.content_type() else {
            return true;
        };
        let mime = content_type.to_ascii_lowercase();
        !NON_MARKUP_PREFIXES
            .iter()
            .any(|prefix| mime.trim_start().starts_with(prefix))
    }

    pub fn was_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }

    pub fn has_redirect_loop(&self) -> bool {
        is_redirect_loop(&self.redirect_chain)
    }
}

/// A chain loops when any URL appears in it more than once.
pub fn is_redirect_loop(chain: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(chain.len());
    chain.iter().any(|hop| !seen.insert(hop.as_str()))
}
