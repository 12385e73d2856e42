use sitescore_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Crawl failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Short machine-readable reason, for surfacing alongside the message.
    pub fn reason(&self) -> &'static str {
        match self {
            AuditError::Scan(ScanError::BlockedBySeedRobots(_)) => "blocked_by_robots",
            AuditError::Scan(ScanError::ZeroPagesCrawled(_)) => "zero_pages_crawled",
            AuditError::Scan(ScanError::InvalidUrl(_)) => "invalid_url",
            AuditError::Scan(ScanError::Cancelled(_)) => "cancelled",
            AuditError::Scan(_) => "crawl_error",
            AuditError::Parse(_) => "parse_error",
            AuditError::Io(_) => "io_error",
            AuditError::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
