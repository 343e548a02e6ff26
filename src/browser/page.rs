//! Page-level helpers: RAII page cleanup, selector waits, pagination
//! controls, and scroll-to-load for infinite-scroll boards.

use std::ops::Deref;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How many consecutive no-progress scroll iterations end the scroll loop.
const SCROLL_NO_PROGRESS_LIMIT: usize = 5;

/// RAII guard that guarantees a page is closed on every exit path.
///
/// chromiumoxide's `Page` has no `Drop`; without an explicit async close the
/// tab leaks a CDP target and browser memory. The guard prefers an explicit
/// `close().await`, and falls back to spawning the close from `Drop` so
/// error and cancellation paths are covered too.
pub struct PageGuard {
    page: Option<Page>,
    label: String,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    pub fn new(page: Page, label: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            label: label.into(),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Close the page, consuming the guard. Preferred over relying on `Drop`
    /// because close failures can be observed here.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(target = %self.label, error = %e, "failed to close page");
            } else {
                debug!(target = %self.label, "page closed");
            }
        }
    }

    pub fn page(&self) -> &Page {
        self.page.as_ref().expect("PageGuard: page already consumed")
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        self.page()
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let label = std::mem::take(&mut self.label);
            self.runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!(target = %label, error = %e, "page cleanup in drop failed");
                }
            });
        }
    }
}

/// Wait until `selector` matches an element, polling up to `timeout`.
///
/// CDP has no built-in selector wait, so this polls the DOM the same way the
/// board's own scripts render it: whichever comes first, match or deadline.
pub async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let start = Instant::now();
    loop {
        match page.find_element(selector).await {
            Ok(element) => return Ok(element),
            Err(_) if start.elapsed() >= timeout => {
                return Err(anyhow!(
                    "timed out after {:?} waiting for selector '{selector}'",
                    timeout
                ));
            }
            Err(_) => tokio::time::sleep(SELECTOR_POLL_INTERVAL).await,
        }
    }
}

/// Probe for pagination controls within `timeout`.
pub async fn has_pagination(page: &Page, container_selector: &str, timeout: Duration) -> bool {
    match wait_for_selector(page, container_selector, timeout).await {
        Ok(_) => {
            info!("pagination controls found");
            true
        }
        Err(_) => {
            info!("no pagination controls found");
            false
        }
    }
}

/// Click the next-page button if it exists and is enabled.
///
/// Returns `true` when the click went through. The post-click wait tolerates
/// boards that re-render in place without a navigation event.
pub async fn click_next_page(page: &Page, next_button_selector: &str) -> bool {
    let button = match page.find_element(next_button_selector).await {
        Ok(button) => button,
        Err(_) => {
            info!("next page button not found");
            return false;
        }
    };

    if is_disabled(&button).await {
        info!("next page button is disabled");
        return false;
    }

    if let Err(e) = button.click().await {
        warn!(error = %e, "failed to click next page button");
        return false;
    }

    let _ = tokio::time::timeout(Duration::from_secs(10), page.wait_for_navigation()).await;
    true
}

async fn is_disabled(button: &Element) -> bool {
    if let Ok(Some(value)) = button.attribute("disabled").await {
        if value != "false" {
            return true;
        }
    }
    matches!(button.attribute("aria-disabled").await, Ok(Some(value)) if value == "true")
}

/// Scroll to the end of the document until the job item count saturates.
///
/// Each iteration scrolls, lets the page settle, and recounts. The loop ends
/// after `max_attempts` iterations or once [`SCROLL_NO_PROGRESS_LIMIT`]
/// consecutive iterations load nothing new. Returns the final item count.
pub async fn scroll_to_load_all(
    page: &Page,
    list_selector: &str,
    item_selector: &str,
    max_attempts: usize,
    settle: Duration,
) -> usize {
    if let Err(e) = wait_for_selector(page, list_selector, Duration::from_secs(15)).await {
        warn!(error = %e, "job list did not appear before scrolling, using what loaded");
    }

    let mut count = count_items(page, item_selector).await;
    let mut no_progress = 0;

    for attempt in 0..max_attempts {
        if let Err(e) = page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
        {
            warn!(error = %e, "scroll evaluation failed");
            break;
        }
        tokio::time::sleep(settle).await;

        let new_count = count_items(page, item_selector).await;
        if new_count > count {
            no_progress = 0;
        } else {
            no_progress += 1;
            debug!(attempt, no_progress, "no new jobs after scroll");
        }
        count = new_count;

        if no_progress >= SCROLL_NO_PROGRESS_LIMIT {
            info!(count, "scroll saturated, assuming end of list");
            break;
        }
    }

    info!(count, "finished scrolling listing page");
    count
}

async fn count_items(page: &Page, item_selector: &str) -> usize {
    page.find_elements(item_selector)
        .await
        .map(|elements| elements.len())
        .unwrap_or(0)
}
