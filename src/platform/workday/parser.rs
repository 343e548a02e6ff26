//! Workday string normalizers.

use chrono::{Days, Local, NaiveDate};
use regex::Regex;
use tracing::warn;

use crate::platform::Parser;

/// Absolute date shapes Workday tenants have been seen to emit. Input is
/// lowercased before matching; chrono matches month names case-insensitively.
const ABSOLUTE_DATE_FORMATS: &[&str] = &[
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parser for Workday raw strings.
///
/// The reference date for relative forms is captured once when the parser is
/// constructed, i.e. once per run. Capturing per call would let a fan-out
/// that crosses midnight produce off-by-one dates within a single run.
pub struct WorkdayParser {
    today: NaiveDate,
    days_ago: Regex,
    plus_days_ago: Regex,
    location_prefix: Regex,
    job_id_prefix: Regex,
    req_prefix: Regex,
}

impl WorkdayParser {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Parser with an explicit reference date.
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            today,
            days_ago: Regex::new(r"posted\s+(\d+)\s+days?\s+ago").expect("valid regex"),
            plus_days_ago: Regex::new(r"posted\s*(\d+)\+\s*days?\s*ago").expect("valid regex"),
            location_prefix: Regex::new(r"(?i)^\s*locations\s*:?\s*").expect("valid regex"),
            job_id_prefix: Regex::new(r"(?i)^job\s*id\s*:?\s*").expect("valid regex"),
            req_prefix: Regex::new(r"(?i)^req-?").expect("valid regex"),
        }
    }

    fn days_back(&self, days: u64) -> Option<NaiveDate> {
        self.today.checked_sub_days(Days::new(days))
    }

    fn parse_absolute(&self, cleaned: &str) -> Option<NaiveDate> {
        ABSOLUTE_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
    }
}

impl Default for WorkdayParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for WorkdayParser {
    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        if raw.trim().is_empty() {
            return None;
        }

        let date_str = raw.to_lowercase().trim().replace("posted on", "");
        let date_str = date_str.trim();

        if date_str.contains("just posted") || date_str.contains("today") {
            return Some(self.today);
        }
        if date_str.contains("yesterday") {
            return self.days_back(1);
        }

        if let Some(captures) = self.days_ago.captures(date_str) {
            if let Ok(days) = captures[1].parse::<u64>() {
                return self.days_back(days);
            }
        }
        if let Some(captures) = self.plus_days_ago.captures(date_str) {
            if let Ok(days) = captures[1].parse::<u64>() {
                return self.days_back(days);
            }
        }

        let cleaned = date_str.replace("posted ", "");
        let cleaned = cleaned.trim();
        match self.parse_absolute(cleaned) {
            Some(date) => Some(date),
            None => {
                warn!(raw, "could not parse posted date");
                None
            }
        }
    }

    fn parse_location(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        self.location_prefix.replace(raw, "").trim().to_string()
    }

    fn parse_job_id(&self, raw: &str) -> String {
        let job_id = raw.trim();
        let job_id = self.job_id_prefix.replace(job_id, "");
        let job_id = self.req_prefix.replace(&job_id, "");
        job_id.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> WorkdayParser {
        WorkdayParser::with_today(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
    }

    #[test]
    fn parses_today_variants() {
        let p = parser();
        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(p.parse_date("Posted Today"), Some(today));
        assert_eq!(p.parse_date("Just Posted"), Some(today));
        assert_eq!(p.parse_date("posted on today"), Some(today));
    }

    #[test]
    fn parses_yesterday() {
        let p = parser();
        assert_eq!(
            p.parse_date("Posted Yesterday"),
            NaiveDate::from_ymd_opt(2026, 3, 14)
        );
    }

    #[test]
    fn relative_days_round_trip() {
        let p = parser();
        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        for n in 0..=365u64 {
            let raw = format!("Posted {n} days ago");
            assert_eq!(
                p.parse_date(&raw),
                today.checked_sub_days(Days::new(n)),
                "failed for n = {n}"
            );
        }
    }

    #[test]
    fn parses_plus_days_form() {
        let p = parser();
        assert_eq!(
            p.parse_date("Posted 30+ Days Ago"),
            NaiveDate::from_ymd_opt(2026, 2, 13)
        );
    }

    #[test]
    fn parses_absolute_dates() {
        let p = parser();
        assert_eq!(
            p.parse_date("Posted Jan 10, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(
            p.parse_date("Posted 01/10/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
    }

    #[test]
    fn unparseable_date_is_none() {
        let p = parser();
        assert_eq!(p.parse_date("open until filled"), None);
        assert_eq!(p.parse_date(""), None);
        assert_eq!(p.parse_date("   "), None);
    }

    #[test]
    fn strips_locations_prefix() {
        let p = parser();
        assert_eq!(p.parse_location("Locations: London, UK"), "London, UK");
        assert_eq!(p.parse_location("locations  New York"), "New York");
        assert_eq!(p.parse_location("Remote - United States"), "Remote - United States");
        assert_eq!(p.parse_location(""), "");
    }

    #[test]
    fn location_parsing_is_idempotent() {
        let p = parser();
        for raw in ["Locations: London, UK", "  Frankfurt  ", "", "Remote"] {
            let once = p.parse_location(raw);
            assert_eq!(p.parse_location(&once), once);
        }
    }

    #[test]
    fn strips_job_id_prefixes() {
        let p = parser();
        assert_eq!(p.parse_job_id("Job ID: 12345"), "12345");
        assert_eq!(p.parse_job_id("REQ-2024-001"), "2024-001");
        assert_eq!(p.parse_job_id("  R-445566  "), "R-445566");
        assert_eq!(p.parse_job_id(""), "");
    }
}
