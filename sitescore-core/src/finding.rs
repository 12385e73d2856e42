use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// 0 is the most severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn all() -> [Severity; 4] {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Technical,
    #[serde(rename = "On-Page")]
    OnPage,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technical => "Technical",
            Category::OnPage => "On-Page",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issue instance on one page.
///
/// Auditors leave `weight` at zero; the scoring engine fills it in from the
/// issue-key table before the page is scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub weight: i32,
}

impl Finding {
    pub fn new(
        category: Category,
        kind: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            kind: kind.into(),
            severity,
            message: message.into(),
            weight: 0,
        }
    }

    pub fn technical(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(Category::Technical, kind, severity, message)
    }

    pub fn on_page(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(Category::OnPage, kind, severity, message)
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Per-severity tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.add(finding.severity, 1);
        }
        counts
    }

    pub fn add(&mut self, severity: Severity, n: usize) {
        match severity {
            Severity::Critical => self.critical += n,
            Severity::High => self.high += n,
            Severity::Medium => self.medium += n,
            Severity::Low => self.low += n,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn merge(&mut self, other: &SeverityCounts) {
        for severity in Severity::all() {
            self.add(severity, other.get(severity));
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_matches_rank() {
        let mut severities = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        severities.sort();
        assert_eq!(severities, Severity::all().to_vec());
        assert!(Severity::all().windows(2).all(|w| w[0].rank() < w[1].rank()));
    }

    #[test]
    fn test_finding_serializes_type_field() {
        let finding = Finding::on_page("Title", Severity::High, "Missing title tag").with_weight(-8);
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "Title");
        assert_eq!(json["category"], "On-Page");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["weight"], -8);
    }

    #[test]
    fn test_counts() {
        let findings = vec![
            Finding::technical("HTTPS", Severity::Critical, "a"),
            Finding::technical("Redirects", Severity::Critical, "b"),
            Finding::on_page("H1", Severity::Low, "c"),
        ];
        let counts = SeverityCounts::from_findings(&findings);
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 3);

        let mut sum = SeverityCounts::default();
        sum.merge(&counts);
        sum.merge(&counts);
        assert_eq!(sum.critical, 4);
    }
}
