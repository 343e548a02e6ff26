//! Browser lifecycle and scrape-tuned page preparation.
//!
//! Launches headless Chromium via chromiumoxide with a tracked handler task,
//! and configures pages the way a cautious scraper wants them: realistic
//! desktop user agent and headers, CSP bypass, and image/stylesheet requests
//! blocked before they cost bandwidth.

pub mod page;

pub use page::{
    click_next_page, has_pagination, scroll_to_load_all, wait_for_selector, PageGuard,
};

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetBlockedUrLsParams, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::json;
use tokio::task::{self, JoinHandle};
use tracing::{info, warn};

/// Desktop user agent presented on every request.
pub const SCRAPE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Request patterns aborted before fetch. Listing and detail extraction only
/// needs the DOM, never pixels or styling.
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.webp", "*.ico", "*.css", "*.woff", "*.woff2",
];

/// Browser instance plus the handler task driving its CDP connection.
///
/// The handler MUST be aborted after the browser is closed, in that order;
/// aborting first severs the connection `Browser::close` still needs.
pub struct BrowserHandle {
    pub browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl BrowserHandle {
    /// Close the browser, stop the handler, and remove the temp profile.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            warn!(
                path = %self.user_data_dir.display(),
                error = %e,
                "failed to remove browser profile directory"
            );
        }
    }
}

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides the search; otherwise well-known install
/// locations are checked, then `which` on Unix.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROMIUM_PATH points to a non-existent file");
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path_str.is_empty() {
                        return Ok(PathBuf::from(path_str));
                    }
                }
            }
        }
    }

    anyhow::bail!("no Chrome/Chromium executable found; set CHROMIUM_PATH")
}

/// Sequence number distinguishing profile directories of concurrent
/// launches within one process.
static LAUNCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Launch a browser configured for scraping.
///
/// Each launch gets a unique temp profile directory so concurrent runs never
/// contend on a profile lock. The handler's `JoinHandle` is tracked inside
/// the returned [`BrowserHandle`] and stopped in `shutdown()`.
pub async fn launch_browser(headless: bool) -> Result<BrowserHandle> {
    let chrome_path = find_browser_executable()?;

    let user_data_dir = std::env::temp_dir().join(format!(
        "rolecrawl_chrome_{}_{}",
        std::process::id(),
        LAUNCH_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&user_data_dir).context("failed to create user data directory")?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .arg(format!("--user-agent={SCRAPE_USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--hide-scrollbars");

    if headless {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::error!(error = ?e, "browser handler error");
            }
        }
    });

    info!(headless, "browser launched");

    Ok(BrowserHandle {
        browser,
        handler: handler_task,
        user_data_dir,
    })
}

/// Apply scrape settings to a freshly created page.
///
/// Overrides the user agent, attaches browser-like headers, bypasses CSP so
/// extraction scripts run on strict sites, and blocks image/stylesheet
/// requests entirely.
pub async fn prepare_page(page: &Page) -> Result<()> {
    page.execute(SetUserAgentOverrideParams {
        user_agent: SCRAPE_USER_AGENT.to_string(),
        accept_language: Some("en-US,en;q=0.5".to_string()),
        platform: Some("Win32".to_string()),
        user_agent_metadata: None,
    })
    .await
    .context("failed to override user agent")?;

    page.execute(SetExtraHttpHeadersParams::new(Headers::new(json!({
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        "Accept-Language": "en-US,en;q=0.5",
        "Connection": "keep-alive",
        "Upgrade-Insecure-Requests": "1",
    }))))
    .await
    .context("failed to set extra headers")?;

    page.execute(SetBypassCspParams::new(true))
        .await
        .context("failed to bypass CSP")?;

    page.execute(SetBlockedUrLsParams::new(
        BLOCKED_URL_PATTERNS.iter().map(|p| (*p).to_string()).collect::<Vec<_>>(),
    ))
    .await
    .context("failed to block resource requests")?;

    Ok(())
}

/// Navigate to the listing page.
///
/// The navigation gets a bounded budget and a timeout is tolerated: job
/// boards routinely keep connections open past the useful render, and the
/// caller's wait for the listing container is the authoritative readiness
/// check.
pub async fn goto_listing(page: &Page, url: &str, budget: Duration) -> Result<()> {
    info!(url, "navigating to listing page");
    let navigation = async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<_, anyhow::Error>(())
    };
    match tokio::time::timeout(budget, navigation).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e).with_context(|| format!("failed to navigate to {url}")),
        Err(_) => {
            warn!(url, "listing navigation timed out, proceeding with partial page");
            Ok(())
        }
    }
}
