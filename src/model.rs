//! In-memory representations of a posting as it moves through a run:
//! listing-page summary, detail-page extraction, and the merged record
//! handed to the sink.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Placeholder for fields a page failed to yield.
pub const NOT_AVAILABLE: &str = "N/A";

/// A posting as extracted from a listing-page card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub title: String,
    /// Always absolute when produced by a crawler.
    pub detail_url: String,
    pub location_raw: String,
    pub date_posted_raw: String,
    pub location_parsed: String,
    /// ISO date, when the raw string could be interpreted.
    pub date_posted_parsed: Option<chrono::NaiveDate>,
}

/// A posting as extracted from its detail page.
///
/// A detail is emitted for every summary that was attempted; on failure all
/// extracted fields fall back to [`NOT_AVAILABLE`] rather than the detail
/// going missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub url: String,
    pub description: String,
    pub job_id: String,
    pub detail_page_title: String,
}

impl JobDetail {
    /// Detail with every extracted field unavailable.
    pub fn unavailable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: NOT_AVAILABLE.to_string(),
            job_id: NOT_AVAILABLE.to_string(),
            detail_page_title: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Structured location produced by the enrichment service.
///
/// The service's `"Unknown"` sentinel is normalized to `None` during
/// deserialization, so downstream consumers and sinks never see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredLocation {
    pub city: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub confidence: f64,
}

impl<'de> Deserialize<'de> for StructuredLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            city: Option<String>,
            country: Option<String>,
            region: Option<String>,
            confidence: Option<f64>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let confidence = raw.confidence.ok_or_else(|| D::Error::missing_field("confidence"))?;
        Ok(Self {
            city: normalize_scalar(raw.city),
            country: normalize_scalar(raw.country),
            region: normalize_scalar(raw.region),
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

fn normalize_scalar(value: Option<String>) -> Option<String> {
    match value {
        Some(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("unknown") => None,
        other => other,
    }
}

/// The merged summary + detail, decorated with run-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub detail_url: String,
    pub company_name: String,
    pub location_raw: String,
    pub location_parsed: String,
    pub date_posted_raw: String,
    pub date_posted_parsed: Option<chrono::NaiveDate>,
    pub description: String,
    pub job_id: String,
    pub detail_page_title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location_parsed_intelligent: Option<StructuredLocation>,
}

impl JobRecord {
    /// Merge a summary with the detail fetched for it.
    pub fn merge(summary: JobSummary, detail: JobDetail, company_name: &str) -> Self {
        Self {
            title: summary.title,
            detail_url: summary.detail_url,
            company_name: company_name.to_string(),
            location_raw: summary.location_raw,
            location_parsed: summary.location_parsed,
            date_posted_raw: summary.date_posted_raw,
            date_posted_parsed: summary.date_posted_parsed,
            description: detail.description,
            job_id: detail.job_id,
            detail_page_title: detail.detail_page_title,
            location_parsed_intelligent: None,
        }
    }
}

/// Resolve a card's href against the listing base URL.
///
/// Absolute hrefs are kept, root-relative hrefs resolve against the listing
/// origin, and anything else is joined onto the base URL path.
pub fn resolve_detail_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    if href.starts_with('/') {
        if let Ok(base) = Url::parse(base_url) {
            return format!("{}{}", base.origin().ascii_serialization(), href);
        }
    }
    format!("{}/{}", base_url.trim_end_matches('/'), href)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(url: &str) -> JobSummary {
        JobSummary {
            title: "Analyst".to_string(),
            detail_url: url.to_string(),
            location_raw: String::new(),
            date_posted_raw: String::new(),
            location_parsed: String::new(),
            date_posted_parsed: None,
        }
    }

    #[test]
    fn absolute_href_is_kept() {
        let url = resolve_detail_url("https://jobs.example.com/job/1", "https://example.com/careers");
        assert_eq!(url, "https://jobs.example.com/job/1");
    }

    #[test]
    fn root_relative_href_uses_origin() {
        let url = resolve_detail_url("/en-US/job/1", "https://acme.wd3.myworkdayjobs.com/en-US/Careers");
        assert_eq!(url, "https://acme.wd3.myworkdayjobs.com/en-US/job/1");
    }

    #[test]
    fn bare_href_joins_base() {
        let url = resolve_detail_url("job/1", "https://example.com/careers/");
        assert_eq!(url, "https://example.com/careers/job/1");
    }

    #[test]
    fn unknown_sentinel_becomes_none() {
        let loc: StructuredLocation = serde_json::from_value(serde_json::json!({
            "city": "London",
            "country": "Unknown",
            "region": "unknown",
            "confidence": 0.9,
        }))
        .unwrap();
        assert_eq!(loc.city.as_deref(), Some("London"));
        assert_eq!(loc.country, None);
        assert_eq!(loc.region, None);
    }

    #[test]
    fn confidence_is_clamped() {
        let loc: StructuredLocation = serde_json::from_value(serde_json::json!({
            "city": null,
            "country": null,
            "region": null,
            "confidence": 1.7,
        }))
        .unwrap();
        assert_eq!(loc.confidence, 1.0);
    }

    #[test]
    fn merge_carries_company_and_leaves_enrichment_absent() {
        let record = JobRecord::merge(
            summary("https://example.com/job/1"),
            JobDetail::unavailable("https://example.com/job/1"),
            "Acme",
        );
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.description, NOT_AVAILABLE);
        assert!(record.location_parsed_intelligent.is_none());
    }
}
