//! Platform plug-in contracts and the registry that binds them.
//!
//! A platform contributes three artifacts: a crawler (drives the listing
//! index and fetches details), a parser (normalizes raw strings), and a
//! config map (selectors plus platform-tuned settings). Platforms join the
//! registry at build time through a [`PlatformBinding`]; the registry merges
//! configs and instantiates crawlers and parsers on demand.

pub mod registry;
pub mod workday;

pub use registry::PlatformRegistry;

use std::fmt;

use async_trait::async_trait;
use chromiumoxide::Page;
use chrono::NaiveDate;

use crate::config::PlatformConfig;
use crate::model::{JobDetail, JobSummary};

/// Platform-specific crawler capabilities.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Drive the listing index and collect summaries across pages.
    ///
    /// Detects whether the board paginates or scrolls infinitely and uses
    /// the matching strategy. Per-page extraction misses contribute zero
    /// summaries without aborting the run.
    async fn paginate(
        &self,
        page: &Page,
        company_name: &str,
        base_url: &str,
        max_pages: Option<usize>,
    ) -> anyhow::Result<Vec<JobSummary>>;

    /// Load one job detail page and extract its fields.
    ///
    /// Extraction misses degrade to `"N/A"` fields in the returned detail.
    /// Only transport-level failures surface, tagged so the caller can make
    /// the retry decision without inspecting error types.
    async fn fetch_detail(&self, page: &Page, url: &str) -> Result<JobDetail, DetailError>;

    /// Extract summaries from the job cards on the current page.
    async fn extract_summaries(&self, page: &Page, base_url: &str)
        -> anyhow::Result<Vec<JobSummary>>;
}

impl fmt::Debug for dyn Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Crawler")
    }
}

/// Platform-specific string normalizers.
pub trait Parser: Send + Sync {
    /// Interpret a raw posted-date string as an ISO date, or `None`.
    fn parse_date(&self, raw: &str) -> Option<NaiveDate>;

    /// Strip platform noise from a raw location string.
    fn parse_location(&self, raw: &str) -> String;

    /// Strip platform prefixes from a raw job id. Never empty-for-null:
    /// the cleaned remainder is returned as-is.
    fn parse_job_id(&self, raw: &str) -> String;
}

impl fmt::Debug for dyn Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Parser")
    }
}

/// Transport outcome of a detail fetch, tagged for retry decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailError {
    /// The page did not reach the required state within its budget.
    RetriableTimeout(String),
    /// The browsing target or its context was lost. Retrying on the same
    /// browser cannot succeed.
    TargetClosed(String),
    /// Any other transport failure. Retried conservatively.
    Other(String),
}

impl DetailError {
    /// Classify a transport error by its message, the same signal set
    /// chromiumoxide exposes for dead targets and timeouts.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("target closed")
            || lower.contains("page closed")
            || lower.contains("browser closed")
            || lower.contains("browser disconnected")
            || lower.contains("session closed")
            || lower.contains("session not found")
            || lower.contains("websocket")
            || lower.contains("channel")
        {
            return Self::TargetClosed(message.to_string());
        }
        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::RetriableTimeout(message.to_string());
        }
        Self::Other(message.to_string())
    }

    /// Whether another attempt can reasonably succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::TargetClosed(_))
    }
}

impl fmt::Display for DetailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriableTimeout(msg) => write!(f, "navigation timeout: {msg}"),
            Self::TargetClosed(msg) => write!(f, "browsing target closed: {msg}"),
            Self::Other(msg) => write!(f, "detail fetch failed: {msg}"),
        }
    }
}

impl std::error::Error for DetailError {}

/// A platform's registry entry: identifier plus constructors for its three
/// artifacts. The crawler constructor doubles as the contract probe; a
/// platform whose crawler rejects its own merged config never registers a
/// working binding.
pub struct PlatformBinding {
    pub identifier: &'static str,
    pub crawler: fn(PlatformConfig) -> Result<Box<dyn Crawler>, String>,
    pub parser: fn() -> Box<dyn Parser>,
    pub config: fn() -> PlatformConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_timeout_is_retriable() {
        let err = DetailError::classify("operation timed out after 60s");
        assert!(matches!(err, DetailError::RetriableTimeout(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn classify_target_closed_is_not_retriable() {
        let err = DetailError::classify("Target closed: the page was detached");
        assert!(matches!(err, DetailError::TargetClosed(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn classify_unknown_retries_conservatively() {
        let err = DetailError::classify("net::ERR_CONNECTION_RESET");
        assert!(matches!(err, DetailError::Other(_)));
        assert!(err.is_retriable());
    }
}
