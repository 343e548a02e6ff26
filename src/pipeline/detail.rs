//! Parallel detail fetching.
//!
//! Each summary becomes one logical task: acquire a concurrency permit, open
//! a fresh page, fetch the detail, decorate, and emit a record. Tasks are
//! independent; one task's failure never cancels its siblings, and results
//! come back in summary order.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::Browser;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::progress::ProgressReporter;
use crate::browser::{prepare_page, PageGuard};
use crate::enrich::BatchJobProcessor;
use crate::model::{JobRecord, JobSummary};
use crate::platform::{Crawler, DetailError};

const DETAIL_ATTEMPTS: usize = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Fetch details for every summary, at most `concurrency` in flight.
///
/// The returned vector is aligned with the input: index `i` holds the record
/// for `summaries[i]`, or `None` when every attempt failed.
pub async fn fetch_details_parallel(
    browser: &Browser,
    crawler: &dyn Crawler,
    enrichment: &BatchJobProcessor,
    company_name: &str,
    summaries: Vec<JobSummary>,
    concurrency: usize,
    progress: &dyn ProgressReporter,
) -> Vec<Option<JobRecord>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let tasks = summaries.into_iter().map(|summary| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let url = summary.detail_url.clone();
            let record = fetch_single(browser, crawler, enrichment, company_name, summary).await;
            progress.detail_finished(&url, record.is_some());
            record
        }
    });

    join_all(tasks).await
}

/// Fetch one detail with retries.
///
/// Up to [`DETAIL_ATTEMPTS`] attempts with exponential backoff; a
/// target-closed failure ends the task immediately since the browsing
/// context is gone. The page is closed on every exit path.
async fn fetch_single(
    browser: &Browser,
    crawler: &dyn Crawler,
    enrichment: &BatchJobProcessor,
    company_name: &str,
    summary: JobSummary,
) -> Option<JobRecord> {
    let url = summary.detail_url.clone();

    for attempt in 1..=DETAIL_ATTEMPTS {
        debug!(url = %url, attempt, "detail fetch attempt");

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let failure = DetailError::classify(&e.to_string());
                warn!(url = %url, attempt, error = %failure, "failed to open detail page");
                if !failure.is_retriable() || attempt == DETAIL_ATTEMPTS {
                    return None;
                }
                tokio::time::sleep(backoff(attempt)).await;
                continue;
            }
        };
        let guard = PageGuard::new(page, url.clone());

        if let Err(e) = prepare_page(&guard).await {
            warn!(url = %url, attempt, error = %e, "failed to prepare detail page");
            guard.close().await;
            if attempt == DETAIL_ATTEMPTS {
                return None;
            }
            tokio::time::sleep(backoff(attempt)).await;
            continue;
        }

        match crawler.fetch_detail(&guard, &url).await {
            Ok(detail) => {
                guard.close().await;
                let mut record = JobRecord::merge(summary.clone(), detail, company_name);
                enrichment.decorate(&mut record).await;
                return Some(record);
            }
            Err(failure) => {
                guard.close().await;
                warn!(url = %url, attempt, error = %failure, "detail fetch failed");
                if !failure.is_retriable() {
                    return None;
                }
                if attempt == DETAIL_ATTEMPTS {
                    warn!(url = %url, "giving up after {DETAIL_ATTEMPTS} attempts");
                    return None;
                }
                tokio::time::sleep(backoff(attempt)).await;
            }
        }
    }

    None
}

fn backoff(attempt: usize) -> Duration {
    BACKOFF_BASE * 2u32.pow(attempt.saturating_sub(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_two_seconds() {
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(2), Duration::from_secs(4));
    }
}
