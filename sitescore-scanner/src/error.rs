use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Seed URL {0} is disallowed by robots.txt")]
    BlockedBySeedRobots(String),

    #[error("No pages were crawled from {0}; the seed is most likely unreachable")]
    ZeroPagesCrawled(String),

    #[error("Crawl of {0} was cancelled before any page was fetched")]
    Cancelled(String),

}

impl ScanError {
    /// Errors that end a crawl instead of being recorded as a statistic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::BlockedBySeedRobots(_)
                | ScanError::ZeroPagesCrawled(_)
                | ScanError::Cancelled(_)
                | ScanError::InvalidUrl(_)
        )
    }

    /// Network-level failures worth another attempt. HTTP status errors never reach here.
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::HttpError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_end_the_crawl() {
        assert!(ScanError::BlockedBySeedRobots("https://ex.com/".into()).is_fatal());
        assert!(ScanError::ZeroPagesCrawled("https://ex.com/".into()).is_fatal());
        assert!(ScanError::Cancelled("https://ex.com/".into()).is_fatal());
        assert!(ScanError::InvalidUrl("nope".into()).is_fatal());
        assert!(!ScanError::InvalidUrl("nope".into()).is_transient());
    }
}
