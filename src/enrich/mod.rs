//! Batched location enrichment.
//!
//! A run makes at most one remote call: the unique raw location strings from
//! every summary go out in a single batch before any detail work starts, and
//! the structured results live in a run-scoped cache. Per-record decoration
//! then reads the cache, falling back to one per-record call on a miss, and
//! to the legacy parser output alone when that fails too. Nothing in here
//! ever raises to the orchestrator.

pub mod client;

pub use client::{LocationModel, OpenRouterClient, DEFAULT_ENRICHMENT_MODEL};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EnrichmentConfig;
use crate::model::{JobRecord, JobSummary, StructuredLocation, NOT_AVAILABLE};

/// Collects unique locations, runs the batched call, and serves lookups.
pub struct BatchLocationProcessor {
    model: Option<Arc<dyn LocationModel>>,
    cache: HashMap<String, StructuredLocation>,
    prepared: bool,
}

impl BatchLocationProcessor {
    /// Derive the engine state from run configuration.
    ///
    /// Disabled stays inert. Enabled without a credential downgrades to
    /// disabled with a single warning rather than failing the run.
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        if !config.enabled {
            debug!("intelligent location parsing disabled");
            return Self::disabled();
        }
        match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                info!(model = %config.model, "intelligent location parsing active");
                Self::with_model(Arc::new(OpenRouterClient::new(key, config.model.clone())))
            }
            _ => {
                warn!("location enrichment enabled but no API credential configured, continuing without it");
                Self::disabled()
            }
        }
    }

    pub fn with_model(model: Arc<dyn LocationModel>) -> Self {
        Self {
            model: Some(model),
            cache: HashMap::new(),
            prepared: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            model: None,
            cache: HashMap::new(),
            prepared: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.model.is_some()
    }

    /// Distinct raw location strings in first-seen order. Empty strings and
    /// `"N/A"` placeholders are excluded; everything else is kept exactly as
    /// extracted, whitespace included, because the cache is keyed on it.
    pub fn extract_unique(summaries: &[JobSummary]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for summary in summaries {
            let raw = &summary.location_raw;
            if raw.trim().is_empty() || raw == NOT_AVAILABLE {
                continue;
            }
            if seen.insert(raw.clone()) {
                unique.push(raw.clone());
            }
        }
        debug!(
            unique = unique.len(),
            summaries = summaries.len(),
            "extracted unique locations"
        );
        unique
    }

    /// Run the single batched remote call and retain its results.
    ///
    /// Guarded so repeated calls cannot produce a second batch request; the
    /// cache is immutable once this returns.
    pub async fn prepare(&mut self, unique: &[String]) {
        let Some(model) = &self.model else { return };
        if unique.is_empty() {
            debug!("no unique locations to process");
            return;
        }
        if self.prepared {
            debug!("batch cache already prepared, skipping");
            return;
        }
        self.prepared = true;

        match model.parse_batch(unique).await {
            Ok(parsed) => {
                info!(locations = parsed.len(), "batch location enrichment complete");
                self.cache = parsed;
            }
            Err(e) => {
                warn!(error = %e, "batch location enrichment failed, will fall back per record");
            }
        }
    }

    pub fn lookup(&self, raw: &str) -> Option<&StructuredLocation> {
        self.cache.get(raw)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolve one raw location: cache hit, then per-record remote call,
    /// then nothing (the caller keeps the legacy parse it already has).
    async fn resolve(&self, raw: &str) -> Option<StructuredLocation> {
        let model = self.model.as_ref()?;
        if raw.trim().is_empty() || raw == NOT_AVAILABLE {
            return None;
        }
        if let Some(hit) = self.lookup(raw) {
            return Some(hit.clone());
        }
        debug!(location = raw, "cache miss, resolving individually");
        match model.parse_single(raw).await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(location = raw, error = %e, "per-record enrichment failed, keeping legacy parse only");
                None
            }
        }
    }
}

/// Run-scoped coordinator: prepares the cache once, decorates each record.
pub struct BatchJobProcessor {
    locations: BatchLocationProcessor,
}

impl BatchJobProcessor {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            locations: BatchLocationProcessor::from_config(config),
        }
    }

    pub fn with_model(model: Arc<dyn LocationModel>) -> Self {
        Self {
            locations: BatchLocationProcessor::with_model(model),
        }
    }

    pub fn disabled() -> Self {
        Self {
            locations: BatchLocationProcessor::disabled(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.locations.is_active()
    }

    pub fn cache_len(&self) -> usize {
        self.locations.cache_len()
    }

    /// Collect unique locations from the summaries and run the batched call.
    /// Must complete before any detail task reads the cache.
    pub async fn prepare_cache(&mut self, summaries: &[JobSummary]) {
        if !self.is_active() {
            debug!("batch cache preparation skipped, enrichment inactive");
            return;
        }
        let unique = BatchLocationProcessor::extract_unique(summaries);
        self.locations.prepare(&unique).await;
    }

    /// Attach the structured location to a record.
    ///
    /// Idempotent: an already-decorated record is left untouched. A record
    /// that cannot be enriched keeps its legacy `location_parsed` and an
    /// absent `location_parsed_intelligent`.
    pub async fn decorate(&self, record: &mut JobRecord) {
        if record.location_parsed_intelligent.is_some() {
            return;
        }
        record.location_parsed_intelligent = self.locations.resolve(&record.location_raw).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnrichError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        batch: HashMap<String, StructuredLocation>,
        batch_calls: AtomicUsize,
        single_calls: AtomicUsize,
        fail_batch: bool,
        fail_single: bool,
    }

    impl ScriptedModel {
        fn new(batch: HashMap<String, StructuredLocation>) -> Self {
            Self {
                batch,
                batch_calls: AtomicUsize::new(0),
                single_calls: AtomicUsize::new(0),
                fail_batch: false,
                fail_single: false,
            }
        }

        fn failing() -> Self {
            let mut model = Self::new(HashMap::new());
            model.fail_batch = true;
            model.fail_single = true;
            model
        }
    }

    #[async_trait]
    impl LocationModel for ScriptedModel {
        async fn parse_batch(
            &self,
            _locations: &[String],
        ) -> Result<HashMap<String, StructuredLocation>, EnrichError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_batch {
                return Err(EnrichError::Api("scripted batch failure".to_string()));
            }
            Ok(self.batch.clone())
        }

        async fn parse_single(
            &self,
            location: &str,
        ) -> Result<StructuredLocation, EnrichError> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_single {
                return Err(EnrichError::Api("scripted single failure".to_string()));
            }
            Ok(StructuredLocation {
                city: Some(location.to_string()),
                country: None,
                region: None,
                confidence: 0.4,
            })
        }
    }

    fn london() -> StructuredLocation {
        StructuredLocation {
            city: Some("London".to_string()),
            country: Some("United Kingdom".to_string()),
            region: Some("Europe".to_string()),
            confidence: 0.95,
        }
    }

    fn summary_with_location(raw: &str) -> JobSummary {
        JobSummary {
            title: "Analyst".to_string(),
            detail_url: format!("https://example.com/job/{}", raw.len()),
            location_raw: raw.to_string(),
            date_posted_raw: String::new(),
            location_parsed: raw.to_string(),
            date_posted_parsed: None,
        }
    }

    fn record_with_location(raw: &str) -> JobRecord {
        JobRecord::merge(
            summary_with_location(raw),
            crate::model::JobDetail::unavailable("https://example.com/job/1"),
            "Acme",
        )
    }

    #[test]
    fn extract_unique_preserves_order_and_skips_placeholders() {
        let summaries = vec![
            summary_with_location("Locations: London, UK"),
            summary_with_location(""),
            summary_with_location("N/A"),
            summary_with_location("Frankfurt"),
            summary_with_location("Locations: London, UK"),
        ];
        let unique = BatchLocationProcessor::extract_unique(&summaries);
        assert_eq!(unique, vec!["Locations: London, UK", "Frankfurt"]);
    }

    #[tokio::test]
    async fn prepare_makes_exactly_one_batch_call() {
        let model = Arc::new(ScriptedModel::new(HashMap::from([(
            "London".to_string(),
            london(),
        )])));
        let mut processor = BatchLocationProcessor::with_model(model.clone());
        let unique = vec!["London".to_string()];
        processor.prepare(&unique).await;
        processor.prepare(&unique).await;
        assert_eq!(model.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(processor.cache_len(), 1);
    }

    #[tokio::test]
    async fn decorate_uses_cache_and_is_idempotent() {
        let model = Arc::new(ScriptedModel::new(HashMap::from([(
            "London".to_string(),
            london(),
        )])));
        let mut processor = BatchJobProcessor::with_model(model.clone());
        processor
            .prepare_cache(&[summary_with_location("London")])
            .await;

        let mut record = record_with_location("London");
        processor.decorate(&mut record).await;
        let decorated_once = record.clone();
        processor.decorate(&mut record).await;

        assert_eq!(record, decorated_once);
        assert_eq!(
            record.location_parsed_intelligent.as_ref().unwrap().city.as_deref(),
            Some("London")
        );
        // Cache hit: no per-record call was needed.
        assert_eq!(model.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cache_miss_falls_back_to_single_call() {
        let model = Arc::new(ScriptedModel::new(HashMap::new()));
        let processor = BatchJobProcessor::with_model(model.clone());

        let mut record = record_with_location("Paris");
        processor.decorate(&mut record).await;

        assert_eq!(model.single_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            record.location_parsed_intelligent.as_ref().unwrap().city.as_deref(),
            Some("Paris")
        );
    }

    #[tokio::test]
    async fn total_failure_leaves_field_absent() {
        let model = Arc::new(ScriptedModel::failing());
        let mut processor = BatchJobProcessor::with_model(model.clone());
        processor
            .prepare_cache(&[summary_with_location("Paris")])
            .await;

        let mut record = record_with_location("Paris");
        processor.decorate(&mut record).await;

        assert!(record.location_parsed_intelligent.is_none());
        assert_eq!(record.location_parsed, "Paris");
    }

    #[tokio::test]
    async fn disabled_engine_never_calls_and_never_decorates() {
        let processor = BatchJobProcessor::disabled();
        let mut record = record_with_location("London");
        processor.decorate(&mut record).await;
        assert!(record.location_parsed_intelligent.is_none());
    }

    #[test]
    fn unconfigured_downgrades_to_disabled() {
        let config = EnrichmentConfig {
            enabled: true,
            api_key: None,
            model: DEFAULT_ENRICHMENT_MODEL.to_string(),
        };
        let processor = BatchJobProcessor::from_config(&config);
        assert!(!processor.is_active());
    }

    #[tokio::test]
    async fn empty_location_is_not_enriched() {
        let model = Arc::new(ScriptedModel::new(HashMap::new()));
        let processor = BatchJobProcessor::with_model(model.clone());
        let mut record = record_with_location("");
        processor.decorate(&mut record).await;
        assert!(record.location_parsed_intelligent.is_none());
        assert_eq!(model.single_calls.load(Ordering::SeqCst), 0);
    }
}
