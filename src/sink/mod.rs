//! Record sinks.
//!
//! [`JobSink`] is the write contract the orchestrator persists through. The
//! bundled [`CsvSink`] appends to a CSV file; database-backed stores
//! implement the same trait externally, mapping `city`/`country`/`region`
//! into their own columns. Records arrive with the `"Unknown"` sentinel
//! already normalized away, so sinks never have to clean it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::SinkError;
use crate::model::JobRecord;

/// Destination for the filtered records of a run.
///
/// `detail_url` is the unique key; upserting sinks replace on collision.
#[async_trait]
pub trait JobSink: Send {
    async fn persist(&mut self, records: &[JobRecord]) -> Result<(), SinkError>;
}

/// Appends records to a CSV file.
///
/// The header is written only when the file is absent or empty, so repeated
/// runs against the same file accumulate rows under a single header.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    detail_url: &'a str,
    title: &'a str,
    company_name: &'a str,
    location_raw: &'a str,
    location_parsed: &'a str,
    date_posted_raw: &'a str,
    date_posted_parsed: Option<chrono::NaiveDate>,
    description: &'a str,
    job_id: &'a str,
    detail_page_title: &'a str,
    city: Option<&'a str>,
    country: Option<&'a str>,
    region: Option<&'a str>,
    confidence: Option<f64>,
}

impl<'a> From<&'a JobRecord> for CsvRow<'a> {
    fn from(record: &'a JobRecord) -> Self {
        let location = record.location_parsed_intelligent.as_ref();
        Self {
            detail_url: &record.detail_url,
            title: &record.title,
            company_name: &record.company_name,
            location_raw: &record.location_raw,
            location_parsed: &record.location_parsed,
            date_posted_raw: &record.date_posted_raw,
            date_posted_parsed: record.date_posted_parsed,
            description: &record.description,
            job_id: &record.job_id,
            detail_page_title: &record.detail_page_title,
            city: location.and_then(|l| l.city.as_deref()),
            country: location.and_then(|l| l.country.as_deref()),
            region: location.and_then(|l| l.region.as_deref()),
            confidence: location.map(|l| l.confidence),
        }
    }
}

#[async_trait]
impl JobSink for CsvSink {
    async fn persist(&mut self, records: &[JobRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            info!(path = %self.path.display(), "no job records to save");
            return Ok(());
        }

        let write_header = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for record in records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer.flush()?;

        info!(
            path = %self.path.display(),
            records = records.len(),
            "job records saved"
        );
        Ok(())
    }
}

/// In-memory sink for tests and callers that post-process records.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<JobRecord>,
}

#[async_trait]
impl JobSink for MemorySink {
    async fn persist(&mut self, records: &[JobRecord]) -> Result<(), SinkError> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}
