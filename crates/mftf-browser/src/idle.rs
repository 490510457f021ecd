//! Page idle-wait protocol
//!
//! After a navigation or an action that kicks off asynchronous UI work, the
//! admin pages are only safe to touch once three things hold:
//!
//! 1. the document has finished loading,
//! 2. no jQuery ajax request is in flight,
//! 3. none of the known loading masks / spinners is visible.
//!
//! Each phase polls its own signal and is bounded by the same timeout. A
//! phase that runs out of time is logged and the next phase starts anyway;
//! running out of time is never an error. When the ajax instrumentation is
//! missing from a page, the protocol falls back to a fixed wait of the full
//! timeout. Every ajax phase ends with a short grace period for trailing UI
//! transitions.

use crate::error::Result;
use crate::webdriver::{eval_bool, WebDriver};
use mftf_core::fail_open::fail_open_or_else;
use mftf_core::{Clock, ElementHandle, Locator};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Known loading masks, spinners and upload indicators, in check order
pub const LOADING_MASK_LOCATORS: &[&str] = &[
    r#"//div[contains(@class, "loading-mask")]"#,
    r#"//div[contains(@class, "admin_data-grid-loading-mask")]"#,
    r#"//div[contains(@class, "admin__data-grid-loading-mask")]"#,
    r#"//div[contains(@class, "admin__form-loading-mask")]"#,
    r#"//div[@data-role="spinner"]"#,
    r#"//div[contains(@class,"file-uploader-spinner")]"#,
    r#"//div[contains(@class,"image-uploader-spinner")]"#,
    r#"//div[contains(@class,"uploader")]//div[@class="file-row"]"#,
];

/// True once the document has fully loaded
pub const DOCUMENT_READY_SCRIPT: &str = r#"document.readyState == "complete""#;

/// True once jQuery reports no active requests; throws when jQuery is absent
pub const AJAX_IDLE_SCRIPT: &str = "window.jQuery.active == 0";

/// How often each phase re-checks its signal
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Fixed settle time after the ajax phase
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// How a single polling phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The signal turned true within the timeout
    Satisfied,
    /// The timeout elapsed first
    TimedOut,
}

/// Waits for admin pages to become idle
///
/// Holds no state between calls; every wait is self-contained.
///
/// # Example
/// ```no_run
/// use mftf_browser::browser::BrowserSession;
/// use mftf_browser::idle::IdleWaitProtocol;
/// use mftf_core::SystemClock;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let session = BrowserSession::launch().await.unwrap();
///     session.navigate("http://magento.local/admin").await.unwrap();
///
///     let idle = IdleWaitProtocol::new(&session, &SystemClock, Duration::from_secs(30));
///     idle.wait_for_page_load(None).await.unwrap();
/// }
/// ```
pub struct IdleWaitProtocol<'a> {
    driver: &'a dyn WebDriver,
    clock: &'a dyn Clock,
    default_timeout: Duration,
    poll_interval: Duration,
    grace_period: Duration,
}

impl<'a> IdleWaitProtocol<'a> {
    /// Create a protocol over a session, using `default_timeout` when callers pass `None`
    pub fn new(driver: &'a dyn WebDriver, clock: &'a dyn Clock, default_timeout: Duration) -> Self {
        Self {
            driver,
            clock,
            default_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Wait for document ready, drained ajax and vanished loading masks, in that order
    ///
    /// Only fails if the session itself stops answering.
    pub async fn wait_for_page_load(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        debug!("Waiting for page load (timeout: {:?})", timeout);

        self.wait_for_document_ready(Some(timeout)).await?;
        self.wait_for_ajax_load(Some(timeout)).await;
        self.wait_for_loading_mask_to_disappear(Some(timeout)).await?;

        debug!("Page load wait finished");
        Ok(())
    }

    /// Poll `document.readyState` until complete or timeout
    pub async fn wait_for_document_ready(&self, timeout: Option<Duration>) -> Result<PollOutcome> {
        let timeout = timeout.unwrap_or(self.default_timeout);

        let outcome = self
            .poll(timeout, || eval_bool(self.driver, DOCUMENT_READY_SCRIPT))
            .await?;

        if outcome == PollOutcome::TimedOut {
            debug!("Document not ready after {:?}, continuing", timeout);
        }
        Ok(outcome)
    }

    /// Wait for all jQuery ajax calls to finish, then settle for the grace period
    ///
    /// If the idle check cannot run on this page, sleeps the whole timeout instead.
    pub async fn wait_for_ajax_load(&self, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(self.default_timeout);

        let drained = self.poll(timeout, || eval_bool(self.driver, AJAX_IDLE_SCRIPT));
        let outcome = fail_open_or_else("ajax idle check", drained, || async {
            info!("js never executed, performing {:?} wait", timeout);
            self.clock.sleep(timeout).await;
            PollOutcome::TimedOut
        })
        .await;

        if outcome == PollOutcome::TimedOut {
            debug!("Ajax not confirmed idle after {:?}", timeout);
        }

        self.clock.sleep(self.grace_period).await;
    }

    /// Wait until every known loading mask is hidden
    ///
    /// Matches for each locator are counted once up front; masks that show up
    /// afterwards are not waited for. Each position is re-resolved on every
    /// check and gets its own timeout.
    pub async fn wait_for_loading_mask_to_disappear(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.default_timeout);

        for mask in LOADING_MASK_LOCATORS {
            let locator = Locator::xpath(*mask);
            let count = self.driver.find_elements(&locator).await?.len();

            for handle in ElementHandle::snapshot(&locator, count) {
                let outcome = self.wait_for_element_not_visible(&handle, timeout).await?;
                if outcome == PollOutcome::TimedOut {
                    warn!("Loading mask {} still visible after {:?}", handle, timeout);
                }
            }
        }

        Ok(())
    }

    /// Poll until the element at the handle's position is hidden or gone
    pub async fn wait_for_element_not_visible(
        &self,
        element: &ElementHandle,
        timeout: Duration,
    ) -> Result<PollOutcome> {
        self.poll(timeout, || async move {
            self.driver.is_visible(element).await.map(|visible| !visible)
        })
        .await
    }

    /// Re-check `condition` every poll interval until it is true or `timeout` has elapsed
    ///
    /// A condition error ends the poll and is returned as is.
    async fn poll<F, Fut>(&self, timeout: Duration, mut condition: F) -> Result<PollOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let started = self.clock.now();

        loop {
            if condition().await? {
                return Ok(PollOutcome::Satisfied);
            }

            let elapsed = self.clock.elapsed_since(started);
            if elapsed >= timeout {
                return Ok(PollOutcome::TimedOut);
            }

            self.clock.sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }
}
