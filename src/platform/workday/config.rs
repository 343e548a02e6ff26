//! Workday DOM selectors and platform-tuned settings.
//!
//! `data-automation-id` attributes are the most stable hooks Workday offers;
//! class names rotate between tenant deployments.

use serde_json::Value;

use crate::config::PlatformConfig;

pub const JOB_LIST_SELECTOR: &str = "ul[data-automation-id='jobResults']";
pub const JOB_ITEM_SELECTOR: &str = "li.css-1q2dra3";
pub const JOB_TITLE_SELECTOR: &str = "a[data-automation-id='jobTitle']";
pub const JOB_LOCATION_SELECTOR: &str = "dd[data-automation-id='locations']";
pub const JOB_POSTED_DATE_SELECTOR: &str = "dd[data-automation-id='postedOn']";

// Detail page
pub const JOB_DESCRIPTION_SELECTOR: &str = "div[data-automation-id='jobPostingDescription']";
pub const JOB_ID_DETAIL_SELECTOR: &str = "span[data-automation-id='jobPostingJobId']";
pub const JOB_DETAIL_TITLE_SELECTOR: &str = "h1[data-automation-id='jobPostingHeader']";

// Listing fallback when the locations cell is absent
pub const JOB_SUBTITLE_SELECTOR: &str = "span[data-automation-id='subtitle']";

// Pagination
pub const PAGINATION_CONTAINER_SELECTOR: &str = "nav[aria-label='pagination']";
pub const NEXT_PAGE_BUTTON_SELECTOR: &str = "button[aria-label='next']";

pub const JOB_DETAIL_CONCURRENCY: usize = 10;

/// The platform layer of the config merge: every constant above, exported
/// under its lowercased name.
pub fn platform_config() -> PlatformConfig {
    let mut map = PlatformConfig::new();
    map.insert("job_list_selector".into(), Value::from(JOB_LIST_SELECTOR));
    map.insert("job_item_selector".into(), Value::from(JOB_ITEM_SELECTOR));
    map.insert("job_title_selector".into(), Value::from(JOB_TITLE_SELECTOR));
    map.insert(
        "job_location_selector".into(),
        Value::from(JOB_LOCATION_SELECTOR),
    );
    map.insert(
        "job_posted_date_selector".into(),
        Value::from(JOB_POSTED_DATE_SELECTOR),
    );
    map.insert(
        "job_description_selector".into(),
        Value::from(JOB_DESCRIPTION_SELECTOR),
    );
    map.insert(
        "job_id_detail_selector".into(),
        Value::from(JOB_ID_DETAIL_SELECTOR),
    );
    map.insert(
        "job_detail_title_selector".into(),
        Value::from(JOB_DETAIL_TITLE_SELECTOR),
    );
    map.insert(
        "job_subtitle_selector".into(),
        Value::from(JOB_SUBTITLE_SELECTOR),
    );
    map.insert(
        "pagination_container_selector".into(),
        Value::from(PAGINATION_CONTAINER_SELECTOR),
    );
    map.insert(
        "next_page_button_selector".into(),
        Value::from(NEXT_PAGE_BUTTON_SELECTOR),
    );
    map.insert(
        "job_detail_concurrency".into(),
        Value::from(JOB_DETAIL_CONCURRENCY as u64),
    );
    map
}
