//! rolecrawl: job board scraping and enrichment pipeline.
//!
//! Aggregates job postings from vendor-hosted career sites into uniform
//! records. Platform plug-ins supply the DOM knowledge (crawler + parser +
//! selector config); a chromiumoxide-driven engine walks listing pages in
//! either pagination or infinite-scroll layout and fans out per-job detail
//! fetches under a bounded concurrency budget; a batched remote-LLM step
//! turns free-text locations into structured `{city, country, region}`
//! fields with one call per run.
//!
//! ```no_run
//! use rolecrawl::{pipeline, CsvSink, PlatformRegistry, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = PlatformRegistry::with_builtin();
//!     let config = RunConfig::new(
//!         "Deutsche Bank",
//!         "https://db.wd3.myworkdayjobs.com/en-US/DBWebsite",
//!         "workday",
//!     );
//!     let mut sink = CsvSink::new("jobs.csv");
//!     let report = pipeline::run(&config, &registry, &mut sink).await?;
//!     println!("emitted {} records", report.records_emitted);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod enrich;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod platform;
pub mod sink;

pub use config::{EnrichmentConfig, PlatformConfig, RunConfig};
pub use enrich::{BatchJobProcessor, BatchLocationProcessor, LocationModel, OpenRouterClient};
pub use error::{EnrichError, ScrapeError, SinkError};
pub use model::{JobDetail, JobRecord, JobSummary, StructuredLocation};
pub use pipeline::RunReport;
pub use platform::{Crawler, DetailError, Parser, PlatformBinding, PlatformRegistry};
pub use sink::{CsvSink, JobSink, MemorySink};
