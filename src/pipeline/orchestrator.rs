//! Full-run orchestration.
//!
//! ```text
//! paginate -> prepare_cache -> fan_out(fetch_detail + decorate) -> filter -> sink
//! ```
//!
//! The orchestrator owns the browser for the duration of the run and hands
//! out pages to detail tasks. The sink runs only after all crawl work has
//! completed, so a cancelled run persists nothing.

use tracing::{info, warn};

use super::detail::fetch_details_parallel;
use super::filter::filter_records;
use super::progress::{NoOpProgress, ProgressReporter};
use crate::browser::{goto_listing, launch_browser, prepare_page, PageGuard};
use crate::config::{cfg_secs, cfg_usize, RunConfig, DEFAULT_JOB_DETAIL_CONCURRENCY, DEFAULT_LISTING_TIMEOUT_SECS};
use crate::enrich::BatchJobProcessor;
use crate::error::ScrapeError;
use crate::platform::PlatformRegistry;
use crate::sink::JobSink;

/// Tally of what a run saw, dropped, and emitted.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub company_name: String,
    pub platform: String,
    /// Summaries collected from the listing index.
    pub summaries: usize,
    /// Summaries that carried a detail URL and were fetched.
    pub attempted_details: usize,
    pub detail_failures: usize,
    pub duplicates_dropped: usize,
    pub stale_dropped: usize,
    pub records_emitted: usize,
    pub enrichment_active: bool,
    pub enriched_locations: usize,
}

/// Execute a complete scrape run with enrichment derived from the config.
pub async fn run(
    config: &RunConfig,
    registry: &PlatformRegistry,
    sink: &mut dyn JobSink,
) -> Result<RunReport, ScrapeError> {
    let enrichment = BatchJobProcessor::from_config(&config.enrichment);
    run_with(config, registry, enrichment, sink, &NoOpProgress).await
}

/// Execute a complete scrape run with an explicit enrichment engine and
/// progress reporter.
pub async fn run_with(
    config: &RunConfig,
    registry: &PlatformRegistry,
    mut enrichment: BatchJobProcessor,
    sink: &mut dyn JobSink,
    progress: &dyn ProgressReporter,
) -> Result<RunReport, ScrapeError> {
    config.validate()?;

    let overrides = config.overrides();
    let crawler = registry.create_crawler(&config.platform, &overrides)?;
    let merged = registry.merged_config(&config.platform, &overrides)?;
    let concurrency = cfg_usize(&merged, "job_detail_concurrency")
        .unwrap_or(DEFAULT_JOB_DETAIL_CONCURRENCY)
        .max(1);
    let listing_budget = cfg_secs(&merged, "listing_timeout_secs", DEFAULT_LISTING_TIMEOUT_SECS);

    info!(
        company = %config.company_name,
        platform = %config.platform,
        url = %config.target_url,
        concurrency,
        "starting scrape run"
    );

    let handle = launch_browser(config.headless)
        .await
        .map_err(ScrapeError::Browser)?;
    progress.browser_launched();

    // Listing phase. The browser must be shut down on every path after this
    // point, so listing errors are collected rather than returned early.
    let summaries = {
        let listing_result = async {
            let page = handle
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| anyhow::anyhow!("failed to open listing page: {e}"))?;
            let guard = PageGuard::new(page, config.target_url.clone());
            prepare_page(&guard).await?;
            goto_listing(&guard, &config.target_url, listing_budget).await?;

            let summaries = crawler
                .paginate(
                    &guard,
                    &config.company_name,
                    &config.target_url,
                    config.max_pages,
                )
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "pagination failed, continuing with no summaries");
                    Vec::new()
                });
            guard.close().await;
            Ok::<_, anyhow::Error>(summaries)
        }
        .await;

        match listing_result {
            Ok(summaries) => summaries,
            Err(e) => {
                handle.shutdown().await;
                return Err(ScrapeError::Browser(e));
            }
        }
    };
    let summaries_total = summaries.len();
    progress.summaries_collected(summaries_total);

    // The cache must be fully populated before any detail task can read it.
    enrichment.prepare_cache(&summaries).await;

    let attempted: Vec<_> = summaries
        .into_iter()
        .filter(|s| !s.detail_url.trim().is_empty())
        .collect();
    let attempted_total = attempted.len();
    if attempted_total < summaries_total {
        info!(
            attempted = attempted_total,
            total = summaries_total,
            "some summaries had no detail URL"
        );
    }

    let results = fetch_details_parallel(
        &handle.browser,
        crawler.as_ref(),
        &enrichment,
        &config.company_name,
        attempted,
        concurrency,
        progress,
    )
    .await;

    handle.shutdown().await;

    let detail_failures = results.iter().filter(|r| r.is_none()).count();
    let records: Vec<_> = results.into_iter().flatten().collect();

    let outcome = filter_records(records);
    let report = RunReport {
        company_name: config.company_name.clone(),
        platform: config.platform.clone(),
        summaries: summaries_total,
        attempted_details: attempted_total,
        detail_failures,
        duplicates_dropped: outcome.duplicates_dropped,
        stale_dropped: outcome.stale_dropped,
        records_emitted: outcome.records.len(),
        enrichment_active: enrichment.is_active(),
        enriched_locations: enrichment.cache_len(),
    };

    sink.persist(&outcome.records).await?;
    progress.run_completed(report.records_emitted);

    info!(
        company = %report.company_name,
        emitted = report.records_emitted,
        failures = report.detail_failures,
        duplicates = report.duplicates_dropped,
        stale = report.stale_dropped,
        "scrape run complete"
    );
    Ok(report)
}
