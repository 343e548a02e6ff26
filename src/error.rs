//! Typed errors surfaced at the run boundary.
//!
//! Only configuration, platform resolution, and sink failures escape a run.
//! Navigation timeouts, extraction misses, parse failures, and enrichment
//! failures are all recovered close to where they occur and never reach
//! these types.

use thiserror::Error;

/// Fatal errors for a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid or missing required run configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested platform is not in the registry.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A registered platform is missing one of its required artifacts.
    #[error("platform '{platform}' failed to load: {reason}")]
    PlatformLoad { platform: String, reason: String },

    /// A platform's crawler or parser does not satisfy its contract.
    #[error("platform '{platform}' violates the {contract} contract: {reason}")]
    PlatformContract {
        platform: String,
        contract: &'static str,
        reason: String,
    },

    /// The browser could not be launched or its connection was lost before
    /// any listing work completed.
    #[error("browser error: {0}")]
    Browser(#[source] anyhow::Error),

    /// The sink rejected the record batch. The in-memory records survive in
    /// the caller's hands until this is handled.
    #[error("sink failure: {0}")]
    Sink(#[from] SinkError),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing records: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(String),

    #[error("store rejected batch: {0}")]
    Store(String),
}

impl From<csv::Error> for SinkError {
    fn from(err: csv::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

/// Errors from the remote enrichment service. These never cross the
/// orchestrator boundary; they trigger the fallback chain instead.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("no API credential configured")]
    Unconfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("service error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}
