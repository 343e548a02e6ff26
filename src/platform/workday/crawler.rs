//! Workday listing crawler and detail fetcher.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::config as defaults;
use super::parser::WorkdayParser;
use crate::browser::{click_next_page, has_pagination, scroll_to_load_all, wait_for_selector};
use crate::config::{
    cfg_millis, cfg_secs, cfg_str, cfg_usize, PlatformConfig, DEFAULT_INTER_PAGE_DELAY_MS,
    DEFAULT_MAX_SCROLL_ATTEMPTS, DEFAULT_NAVIGATION_TIMEOUT_SECS,
    DEFAULT_PAGINATION_PROBE_TIMEOUT_SECS, DEFAULT_SCROLL_SETTLE_MS,
    DEFAULT_SELECTOR_TIMEOUT_SECS,
};
use crate::model::{resolve_detail_url, JobDetail, JobSummary};
use crate::platform::{Crawler, DetailError, Parser};

/// Locates a job id by its visible label when the dedicated selector misses.
/// Some tenants render the id as a labelled text node instead of the
/// `jobPostingJobId` automation id.
const JOB_ID_FALLBACK_JS: &str = r#"
(() => {
    const nodes = Array.from(document.querySelectorAll('span, dd, div'));
    const labelled = nodes.find(n => /^\s*job\s*id\b/i.test(n.textContent || ''));
    if (!labelled) return null;
    const sibling = labelled.nextElementSibling;
    if (sibling && sibling.textContent && sibling.textContent.trim()) {
        return sibling.textContent.trim();
    }
    return labelled.textContent.trim();
})()
"#;

struct Selectors {
    job_list: String,
    job_item: String,
    job_title: String,
    job_location: String,
    job_posted_date: String,
    job_subtitle: String,
    job_description: String,
    job_id_detail: String,
    job_detail_title: String,
    pagination_container: String,
    next_page_button: String,
}

pub struct WorkdayCrawler {
    selectors: Selectors,
    parser: WorkdayParser,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    pagination_probe_timeout: Duration,
    inter_page_delay: Duration,
    scroll_settle: Duration,
    max_scroll_attempts: usize,
}

impl WorkdayCrawler {
    /// Build a crawler from the merged config map.
    ///
    /// Every selector the crawler depends on must be present and non-empty;
    /// a config that strips one produces a contract violation, not a crawler
    /// that silently extracts nothing.
    pub fn from_config(config: PlatformConfig) -> Result<Self, String> {
        let selector = |key: &str, default: &str| -> Result<String, String> {
            let value = cfg_str(&config, key).unwrap_or(default);
            if value.trim().is_empty() {
                return Err(format!("selector '{key}' must not be empty"));
            }
            Ok(value.to_string())
        };

        let selectors = Selectors {
            job_list: selector("job_list_selector", defaults::JOB_LIST_SELECTOR)?,
            job_item: selector("job_item_selector", defaults::JOB_ITEM_SELECTOR)?,
            job_title: selector("job_title_selector", defaults::JOB_TITLE_SELECTOR)?,
            job_location: selector("job_location_selector", defaults::JOB_LOCATION_SELECTOR)?,
            job_posted_date: selector(
                "job_posted_date_selector",
                defaults::JOB_POSTED_DATE_SELECTOR,
            )?,
            job_subtitle: selector("job_subtitle_selector", defaults::JOB_SUBTITLE_SELECTOR)?,
            job_description: selector(
                "job_description_selector",
                defaults::JOB_DESCRIPTION_SELECTOR,
            )?,
            job_id_detail: selector("job_id_detail_selector", defaults::JOB_ID_DETAIL_SELECTOR)?,
            job_detail_title: selector(
                "job_detail_title_selector",
                defaults::JOB_DETAIL_TITLE_SELECTOR,
            )?,
            pagination_container: selector(
                "pagination_container_selector",
                defaults::PAGINATION_CONTAINER_SELECTOR,
            )?,
            next_page_button: selector(
                "next_page_button_selector",
                defaults::NEXT_PAGE_BUTTON_SELECTOR,
            )?,
        };

        Ok(Self {
            selectors,
            parser: WorkdayParser::new(),
            navigation_timeout: cfg_secs(
                &config,
                "navigation_timeout_secs",
                DEFAULT_NAVIGATION_TIMEOUT_SECS,
            ),
            selector_timeout: cfg_secs(
                &config,
                "selector_timeout_secs",
                DEFAULT_SELECTOR_TIMEOUT_SECS,
            ),
            pagination_probe_timeout: cfg_secs(
                &config,
                "pagination_probe_timeout_secs",
                DEFAULT_PAGINATION_PROBE_TIMEOUT_SECS,
            ),
            inter_page_delay: cfg_millis(
                &config,
                "inter_page_delay_ms",
                DEFAULT_INTER_PAGE_DELAY_MS,
            ),
            scroll_settle: cfg_millis(&config, "scroll_settle_ms", DEFAULT_SCROLL_SETTLE_MS),
            max_scroll_attempts: cfg_usize(&config, "max_scroll_attempts")
                .unwrap_or(DEFAULT_MAX_SCROLL_ATTEMPTS),
        })
    }

    async fn subtitle_location(&self, item: &Element) -> String {
        let Ok(subtitle) = item.find_element(&self.selectors.job_subtitle).await else {
            return String::new();
        };
        subtitle
            .inner_text()
            .await
            .ok()
            .flatten()
            .and_then(|text| text.split(" | ").next().map(|s| s.trim().to_string()))
            .unwrap_or_default()
    }

    async fn job_id_text_fallback(&self, page: &Page) -> Option<String> {
        let result = page.evaluate(JOB_ID_FALLBACK_JS).await.ok()?;
        result.into_value::<Option<String>>().ok().flatten()
    }
}

#[async_trait]
impl Crawler for WorkdayCrawler {
    async fn paginate(
        &self,
        page: &Page,
        company_name: &str,
        base_url: &str,
        max_pages: Option<usize>,
    ) -> Result<Vec<JobSummary>> {
        info!(company = company_name, url = base_url, "starting pagination");
        let mut all_summaries = Vec::new();

        if max_pages == Some(0) {
            return Ok(all_summaries);
        }

        if let Err(e) = wait_for_selector(page, &self.selectors.job_list, self.navigation_timeout).await
        {
            warn!(company = company_name, error = %e, "job list container never appeared");
            return Ok(all_summaries);
        }

        let paginated = has_pagination(
            page,
            &self.selectors.pagination_container,
            self.pagination_probe_timeout,
        )
        .await;

        if paginated {
            let mut page_num = 1usize;
            loop {
                info!(page = page_num, "processing listing page");
                match self.extract_summaries(page, base_url).await {
                    Ok(summaries) => {
                        if summaries.is_empty() {
                            warn!(page = page_num, "no jobs found on listing page");
                        }
                        all_summaries.extend(summaries);
                    }
                    Err(e) => warn!(page = page_num, error = %e, "listing page extraction failed"),
                }

                if max_pages.is_some_and(|max| page_num >= max) {
                    info!(max_pages = max_pages.unwrap_or(0), "reached page limit");
                    break;
                }
                if !click_next_page(page, &self.selectors.next_page_button).await {
                    info!("no more pages available");
                    break;
                }
                page_num += 1;
                tokio::time::sleep(self.inter_page_delay).await;
            }
        } else {
            scroll_to_load_all(
                page,
                &self.selectors.job_list,
                &self.selectors.job_item,
                self.max_scroll_attempts,
                self.scroll_settle,
            )
            .await;
            match self.extract_summaries(page, base_url).await {
                Ok(summaries) => all_summaries = summaries,
                Err(e) => warn!(error = %e, "listing extraction failed after scrolling"),
            }
        }

        info!(
            company = company_name,
            total = all_summaries.len(),
            "pagination complete"
        );
        Ok(all_summaries)
    }

    async fn fetch_detail(&self, page: &Page, url: &str) -> Result<JobDetail, DetailError> {
        debug!(url, "fetching job detail");
        let mut detail = JobDetail::unavailable(url);

        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Err(_) => {
                return Err(DetailError::RetriableTimeout(format!(
                    "navigation to {url} exceeded {:?}",
                    self.navigation_timeout
                )));
            }
            Ok(Err(e)) => return Err(DetailError::classify(&e.to_string())),
            Ok(Ok(_)) => {}
        }

        if let Err(e) =
            wait_for_selector(page, &self.selectors.job_description, self.selector_timeout).await
        {
            warn!(url, error = %e, "job description never appeared, returning partial detail");
            return Ok(detail);
        }

        if let Ok(title_el) = page.find_element(&self.selectors.job_detail_title).await {
            if let Ok(Some(text)) = title_el.inner_text().await {
                detail.detail_page_title = text.trim().to_string();
            }
        }

        if let Ok(description_el) = page.find_element(&self.selectors.job_description).await {
            if let Ok(Some(text)) = description_el.inner_text().await {
                detail.description = text;
            }
        }

        let raw_job_id = match page.find_element(&self.selectors.job_id_detail).await {
            Ok(id_el) => id_el.inner_text().await.ok().flatten(),
            Err(_) => self.job_id_text_fallback(page).await,
        };
        if let Some(raw) = raw_job_id {
            let cleaned = self.parser.parse_job_id(&raw);
            if !cleaned.is_empty() {
                detail.job_id = cleaned;
            }
        }

        Ok(detail)
    }

    async fn extract_summaries(
        &self,
        page: &Page,
        base_url: &str,
    ) -> Result<Vec<JobSummary>> {
        let items = page
            .find_elements(&self.selectors.job_item)
            .await
            .context("job card query failed")?;

        let mut summaries = Vec::new();
        for item in &items {
            let Ok(title_el) = item.find_element(&self.selectors.job_title).await else {
                continue;
            };
            let title = match title_el.inner_text().await {
                Ok(Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
                _ => continue,
            };
            let href = match title_el.attribute("href").await {
                Ok(Some(href)) if !href.is_empty() => href,
                _ => {
                    debug!(title = %title, "job card has no detail href, skipping");
                    continue;
                }
            };
            let detail_url = resolve_detail_url(&href, base_url);

            let location_raw = match item.find_element(&self.selectors.job_location).await {
                Ok(location_el) => location_el
                    .inner_text()
                    .await
                    .ok()
                    .flatten()
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default(),
                Err(_) => self.subtitle_location(item).await,
            };

            let date_posted_raw = match item.find_element(&self.selectors.job_posted_date).await {
                Ok(date_el) => date_el
                    .inner_text()
                    .await
                    .ok()
                    .flatten()
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default(),
                Err(_) => String::new(),
            };

            summaries.push(JobSummary {
                location_parsed: self.parser.parse_location(&location_raw),
                date_posted_parsed: self.parser.parse_date(&date_posted_raw),
                title,
                detail_url,
                location_raw,
                date_posted_raw,
            });
        }

        debug!(count = summaries.len(), "extracted job summaries");
        Ok(summaries)
    }
}
