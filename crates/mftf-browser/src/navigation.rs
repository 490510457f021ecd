//! Opening pages
//!
//! Every page opened through [`am_on_page`] is waited on with the full
//! idle-wait protocol before control returns to the caller.

use crate::error::Result;
use crate::idle::IdleWaitProtocol;
use crate::webdriver::WebDriver;
use mftf_core::Clock;
use std::time::Duration;
use tracing::info;

/// Absolute URL for `page`
///
/// `http://` and `https://` URLs are kept as they are; anything else is a
/// path joined onto `base_url`.
pub fn resolve_page_url(base_url: &str, page: &str) -> String {
    let page = page.trim();
    if page.starts_with("http://") || page.starts_with("https://") {
        return page.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        page.trim_start_matches('/')
    )
}

/// Open `page` (absolute, or relative to `base_url`) and wait for it to become idle
///
/// Returns the URL that was loaded.
pub async fn am_on_page(
    driver: &dyn WebDriver,
    clock: &dyn Clock,
    base_url: &str,
    page: &str,
    timeout: Duration,
) -> Result<String> {
    let url = resolve_page_url(base_url, page);
    driver.navigate(&url).await?;

    IdleWaitProtocol::new(driver, clock, timeout)
        .wait_for_page_load(None)
        .await?;

    info!("On page {}", url);
    Ok(url)
}
