//! CSV sink behavior: header-once semantics, append mode, and the absence
//! of the "Unknown" sentinel in anything that reaches disk.

use rolecrawl::{CsvSink, JobDetail, JobRecord, JobSink, JobSummary, StructuredLocation};
use tempfile::TempDir;

fn record(url: &str, title: &str) -> JobRecord {
    JobRecord::merge(
        JobSummary {
            title: title.to_string(),
            detail_url: url.to_string(),
            location_raw: "Locations: London, UK".to_string(),
            date_posted_raw: "Posted Today".to_string(),
            location_parsed: "London, UK".to_string(),
            date_posted_parsed: chrono::NaiveDate::from_ymd_opt(2026, 3, 15),
        },
        JobDetail {
            url: url.to_string(),
            description: "Quantitative analysis".to_string(),
            job_id: "2024-001".to_string(),
            detail_page_title: title.to_string(),
        },
        "Acme",
    )
}

#[tokio::test]
async fn header_is_written_once_across_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobs.csv");

    let mut sink = CsvSink::new(&path);
    sink.persist(&[record("https://example.com/u1", "Analyst")])
        .await
        .unwrap();
    sink.persist(&[record("https://example.com/u2", "Trader")])
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("detail_url,title,company_name"));
    assert_eq!(
        contents.matches("detail_url,title").count(),
        1,
        "header must appear exactly once"
    );
    assert!(lines[1].contains("https://example.com/u1"));
    assert!(lines[2].contains("https://example.com/u2"));
}

#[tokio::test]
async fn empty_batch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobs.csv");

    let mut sink = CsvSink::new(&path);
    sink.persist(&[]).await.unwrap();

    assert!(!path.exists());
}

#[tokio::test]
async fn structured_location_maps_to_columns_without_unknown() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobs.csv");

    let mut enriched = record("https://example.com/u1", "Analyst");
    // Deserialization is the normalization point for the remote service's
    // "Unknown" sentinel.
    enriched.location_parsed_intelligent = Some(
        serde_json::from_value::<StructuredLocation>(serde_json::json!({
            "city": "London",
            "country": "United Kingdom",
            "region": "Unknown",
            "confidence": 0.9,
        }))
        .unwrap(),
    );

    let mut sink = CsvSink::new(&path);
    sink.persist(&[enriched]).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("London"));
    assert!(contents.contains("United Kingdom"));
    assert!(!contents.contains("Unknown"));
}

#[tokio::test]
async fn existing_file_with_content_is_appended_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobs.csv");
    std::fs::write(&path, "detail_url,title\nhttps://example.com/u0,Old\n").unwrap();

    let mut sink = CsvSink::new(&path);
    sink.persist(&[record("https://example.com/u1", "Analyst")])
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("detail_url,title\nhttps://example.com/u0,Old\n"));
    assert!(contents.contains("https://example.com/u1"));
}
