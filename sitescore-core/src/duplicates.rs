// Duplicate title / description / H1 detection across a whole crawl

use crate::audit::PageSignals;
use crate::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Pages sharing one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub text: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub titles: Vec<DuplicateGroup>,
    pub meta_descriptions: Vec<DuplicateGroup>,
    pub h1s: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.meta_descriptions.is_empty() && self.h1s.is_empty()
    }
}

#[derive(Debug, Default)]
struct TextIndex {
    /// normalized text -> (first display form, urls)
    entries: BTreeMap<String, (String, BTreeSet<String>)>,
}

impl TextIndex {
    fn record(&mut self, url: &str, text: &str) {
        let key = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if key.is_empty() {
            return;
        }
        self.entries
            .entry(key)
            .or_insert_with(|| (text.to_string(), BTreeSet::new()))
            .1
            .insert(url.to_string());
    }

    fn groups(&self) -> Vec<DuplicateGroup> {
        self.entries
            .values()
            .filter(|(_, urls)| urls.len() > 1)
            .map(|(text, urls)| DuplicateGroup {
                text: text.clone(),
                urls: urls.iter().cloned().collect(),
            })
            .collect()
    }
}

/// Text multimaps filled as pages are audited and read once the crawl is complete.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    titles: TextIndex,
    descriptions: TextIndex,
    h1s: TextIndex,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, signals: &PageSignals) {
        if let Some(ref title) = signals.title {
            self.titles.record(url, title);
        }
        if let Some(ref description) = signals.meta_description {
            self.descriptions.record(url, description);
        }
        if let Some(ref h1) = signals.h1 {
            self.h1s.record(url, h1);
        }
    }

    pub fn report(&self) -> DuplicateReport {
        DuplicateReport {
            titles: self.titles.groups(),
            meta_descriptions: self.descriptions.groups(),
            h1s: self.h1s.groups(),
        }
    }

    /// Findings to append per URL, one per duplicate group the page belongs to.
    pub fn findings(&self) -> BTreeMap<String, Vec<Finding>> {
        let report = self.report();
        let mut by_url: BTreeMap<String, Vec<Finding>> = BTreeMap::new();

        let sources = [
            (&report.titles, "Title", Severity::Medium, "Duplicate title tag"),
            (
                &report.meta_descriptions,
                "Meta Description",
                Severity::Low,
                "Duplicate meta description",
            ),
            (&report.h1s, "H1", Severity::Low, "Duplicate H1 heading"),
        ];

        for (groups, kind, severity, message) in sources {
            for group in groups {
                for url in &group.urls {
                    by_url
                        .entry(url.clone())
                        .or_default()
                        .push(Finding::on_page(kind, severity, message));
                }
            }
        }

        by_url
    }
}
