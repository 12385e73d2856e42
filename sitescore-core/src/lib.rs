pub mod aggregate;
pub mod audit;
pub mod crawl;
pub mod duplicates;
pub mod error;
pub mod finding;
pub mod pipeline;
pub mod report;
pub mod scoring;

pub use aggregate::{IssueGroup, SiteStats, aggregate, group_issues, normalize_message};
pub use audit::{OnPageAuditor, PageAuditor, PageInput, PageSignals, TechnicalAuditor, run_auditors};
pub use crawl::{AuditOptions, execute_audit};
pub use duplicates::{DuplicateGroup, DuplicateIndex, DuplicateReport};
pub use error::{AuditError, Result};
pub use finding::{Category, Finding, Severity, SeverityCounts};
pub use pipeline::{AuditPipeline, run_audit};
pub use report::{AuditReport, PageReport, ReportFormat, generate_json_report, generate_text_report, save_report};
pub use scoring::{IssueKey, PageScore, ScoringConfig, ScoringEngine, classify};
