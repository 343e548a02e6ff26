//! Run-level configuration and the merged platform config map.
//!
//! A run is configured by a [`RunConfig`] value. Platform-specific settings
//! (selectors, timeouts, concurrency) travel as a [`PlatformConfig`] map that
//! the factory assembles from three layers, lowest precedence first: the
//! general defaults below, the platform's own config, and run-supplied
//! overrides. The merged map is handed to the crawler constructor; selectors
//! inside it are opaque to everything but the crawler that consumes them.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::ScrapeError;

/// Merged configuration map passed to crawler constructors.
pub type PlatformConfig = HashMap<String, Value>;

/// Default number of in-flight detail fetches.
pub const DEFAULT_JOB_DETAIL_CONCURRENCY: usize = 10;

/// Default timeout for detail-page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Default timeout for waiting on a required selector.
pub const DEFAULT_SELECTOR_TIMEOUT_SECS: u64 = 10;

/// Default budget for the initial listing-page navigation. A timeout here is
/// tolerated; the listing container wait is authoritative.
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 20;

/// Default budget for the pagination-presence probe.
pub const DEFAULT_PAGINATION_PROBE_TIMEOUT_SECS: u64 = 5;

/// Default delay between listing pages.
pub const DEFAULT_INTER_PAGE_DELAY_MS: u64 = 2000;

/// Default settle time after each scroll step.
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 1000;

/// Default cap on scroll iterations for infinite-scroll boards.
pub const DEFAULT_MAX_SCROLL_ATTEMPTS: usize = 20;

/// Configuration for one scrape run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub company_name: String,
    pub target_url: String,
    pub platform: String,
    pub max_pages: Option<usize>,
    /// Overrides the platform's `job_detail_concurrency` when set.
    pub job_detail_concurrency: Option<usize>,
    pub headless: bool,
    pub enrichment: EnrichmentConfig,
}

impl RunConfig {
    pub fn new(
        company_name: impl Into<String>,
        target_url: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            target_url: target_url.into(),
            platform: platform.into().to_lowercase(),
            max_pages: None,
            job_detail_concurrency: None,
            headless: true,
            enrichment: EnrichmentConfig::default(),
        }
    }

    /// Check the required fields before any browser work starts.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.company_name.trim().is_empty() {
            return Err(ScrapeError::Configuration(
                "company_name must not be empty".to_string(),
            ));
        }
        match Url::parse(&self.target_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ScrapeError::Configuration(format!(
                    "target_url is not an absolute http(s) URL: '{}'",
                    self.target_url
                )));
            }
        }
        if self.platform.trim().is_empty() {
            return Err(ScrapeError::Configuration(
                "platform must not be empty".to_string(),
            ));
        }
        if self.job_detail_concurrency == Some(0) {
            return Err(ScrapeError::Configuration(
                "job_detail_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Run-supplied values that take the highest precedence in the merge.
    pub fn overrides(&self) -> PlatformConfig {
        let mut map = PlatformConfig::new();
        if let Some(concurrency) = self.job_detail_concurrency {
            map.insert(
                "job_detail_concurrency".to_string(),
                Value::from(concurrency as u64),
            );
        }
        map
    }
}

/// Configuration for the location enrichment engine.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    /// Feature flag. Off short-circuits every remote call.
    pub enabled: bool,
    /// Opaque credential for the remote service. Enabled-but-absent
    /// downgrades the engine with a single warning.
    pub api_key: Option<String>,
    /// Model identifier forwarded to the remote service.
    pub model: String,
}

/// General defaults, the lowest layer of the config merge.
pub fn general_defaults() -> PlatformConfig {
    let mut map = PlatformConfig::new();
    map.insert(
        "job_detail_concurrency".to_string(),
        Value::from(DEFAULT_JOB_DETAIL_CONCURRENCY as u64),
    );
    map.insert(
        "navigation_timeout_secs".to_string(),
        Value::from(DEFAULT_NAVIGATION_TIMEOUT_SECS),
    );
    map.insert(
        "selector_timeout_secs".to_string(),
        Value::from(DEFAULT_SELECTOR_TIMEOUT_SECS),
    );
    map.insert(
        "listing_timeout_secs".to_string(),
        Value::from(DEFAULT_LISTING_TIMEOUT_SECS),
    );
    map.insert(
        "pagination_probe_timeout_secs".to_string(),
        Value::from(DEFAULT_PAGINATION_PROBE_TIMEOUT_SECS),
    );
    map.insert(
        "inter_page_delay_ms".to_string(),
        Value::from(DEFAULT_INTER_PAGE_DELAY_MS),
    );
    map.insert(
        "scroll_settle_ms".to_string(),
        Value::from(DEFAULT_SCROLL_SETTLE_MS),
    );
    map.insert(
        "max_scroll_attempts".to_string(),
        Value::from(DEFAULT_MAX_SCROLL_ATTEMPTS as u64),
    );
    map
}

/// Read a string value from a merged config map.
pub fn cfg_str<'a>(config: &'a PlatformConfig, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

/// Read an integer value from a merged config map.
pub fn cfg_usize(config: &PlatformConfig, key: &str) -> Option<usize> {
    config.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

/// Read a duration stored in seconds.
pub fn cfg_secs(config: &PlatformConfig, key: &str, default: u64) -> Duration {
    Duration::from_secs(config.get(key).and_then(Value::as_u64).unwrap_or(default))
}

/// Read a duration stored in milliseconds.
pub fn cfg_millis(config: &PlatformConfig, key: &str, default: u64) -> Duration {
    Duration::from_millis(config.get(key).and_then(Value::as_u64).unwrap_or(default))
}
