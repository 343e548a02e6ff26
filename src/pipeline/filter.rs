//! Post-fetch record filtering.

use std::collections::HashSet;

use tracing::info;

use crate::model::JobRecord;

/// Raw-date marker for postings too old to keep.
const STALE_MARKER: &str = "posted 30+ days ago";

/// Filtered records plus what was removed.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub records: Vec<JobRecord>,
    pub duplicates_dropped: usize,
    pub stale_dropped: usize,
}

/// Drop repeated detail URLs (first occurrence wins) and stale postings.
/// Input order is preserved; applying the filter to its own output is a
/// no-op.
pub fn filter_records(records: Vec<JobRecord>) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut seen_urls = HashSet::new();

    for record in records {
        if !seen_urls.insert(record.detail_url.clone()) {
            outcome.duplicates_dropped += 1;
            continue;
        }
        if record.date_posted_raw.to_lowercase().contains(STALE_MARKER) {
            outcome.stale_dropped += 1;
            continue;
        }
        outcome.records.push(record);
    }

    info!(
        kept = outcome.records.len(),
        duplicates = outcome.duplicates_dropped,
        stale = outcome.stale_dropped,
        "filtered job records"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobDetail, JobSummary};

    fn record(url: &str, date_raw: &str) -> JobRecord {
        JobRecord::merge(
            JobSummary {
                title: "Analyst".to_string(),
                detail_url: url.to_string(),
                location_raw: String::new(),
                date_posted_raw: date_raw.to_string(),
                location_parsed: String::new(),
                date_posted_parsed: None,
            },
            JobDetail::unavailable(url),
            "Acme",
        )
    }

    #[test]
    fn first_occurrence_wins_for_duplicates() {
        let records = vec![
            record("https://example.com/u1", "Posted Today"),
            record("https://example.com/u1", "Posted Today"),
            record("https://example.com/u2", "Posted Today"),
        ];
        let outcome = filter_records(records);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.duplicates_dropped, 1);
        assert_eq!(outcome.records[0].detail_url, "https://example.com/u1");
        assert_eq!(outcome.records[1].detail_url, "https://example.com/u2");
    }

    #[test]
    fn stale_postings_are_dropped_case_insensitively() {
        let records = vec![
            record("https://example.com/u1", "Posted 2 days ago"),
            record("https://example.com/u2", "Posted 30+ Days Ago"),
            record("https://example.com/u3", "POSTED 30+ DAYS AGO"),
        ];
        let outcome = filter_records(records);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.stale_dropped, 2);
        assert_eq!(outcome.records[0].detail_url, "https://example.com/u1");
    }

    #[test]
    fn filter_is_stable_under_reapplication() {
        let records = vec![
            record("https://example.com/u1", "Posted Today"),
            record("https://example.com/u1", "Posted 30+ days ago"),
            record("https://example.com/u2", "Posted Yesterday"),
        ];
        let once = filter_records(records);
        let twice = filter_records(once.records.clone());
        assert_eq!(once.records, twice.records);
        assert_eq!(twice.duplicates_dropped, 0);
        assert_eq!(twice.stale_dropped, 0);
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let outcome = filter_records(Vec::new());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.duplicates_dropped, 0);
        assert_eq!(outcome.stale_dropped, 0);
    }
}
