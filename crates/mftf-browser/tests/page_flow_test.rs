//! Integration tests for the page synchronization and drag helpers
//!
//! Drives a simulated admin page whose state changes as (manual) time passes:
//! - the document finishes loading after a delay
//! - an ajax request is in flight for a while
//! - a grid spinner stays visible until the request completes
//! - a category tree supports drag and drop

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mftf_browser::idle::{AJAX_IDLE_SCRIPT, DOCUMENT_READY_SCRIPT, LOADING_MASK_LOCATORS};
use mftf_browser::{am_on_page, drag_and_drop, BrowserError, IdleWaitProtocol, Result, WebDriver};
use mftf_core::{Clock, ElementHandle, Locator, ManualClock, Point, PointerOp};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Simulated admin page, reading time from the shared clock
struct AdminPage {
    clock: Arc<ManualClock>,
    opened_at: DateTime<Utc>,
    document_ready_after: Duration,
    ajax_done_after: Option<Duration>,
    spinner: Locator,
    positions: Vec<(Locator, Point)>,
    performed: Mutex<Vec<PointerOp>>,
    visited: Mutex<Vec<String>>,
}

impl AdminPage {
    fn new(clock: Arc<ManualClock>) -> Self {
        let opened_at = clock.now();
        Self {
            clock,
            opened_at,
            document_ready_after: Duration::from_millis(500),
            ajax_done_after: Some(Duration::from_secs(2)),
            spinner: Locator::xpath(LOADING_MASK_LOCATORS[2]),
            positions: vec![
                (Locator::xpath("//li[@data-id='4']/a"), Point::new(10.0, 10.0)),
                (Locator::xpath("//li[@data-id='2']/a"), Point::new(50.0, 30.0)),
            ],
            performed: Mutex::new(Vec::new()),
            visited: Mutex::new(Vec::new()),
        }
    }

    fn age(&self) -> Duration {
        self.clock.elapsed_since(self.opened_at)
    }

    fn ajax_done(&self) -> Option<bool> {
        self.ajax_done_after.map(|after| self.age() >= after)
    }
}

#[async_trait]
impl WebDriver for AdminPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        match script {
            DOCUMENT_READY_SCRIPT => Ok(Value::Bool(self.age() >= self.document_ready_after)),
            AJAX_IDLE_SCRIPT => match self.ajax_done() {
                Some(done) => Ok(Value::Bool(done)),
                None => Err(BrowserError::Script(
                    "TypeError: window.jQuery is undefined".to_string(),
                )),
            },
            other => Err(BrowserError::Script(format!("unexpected script: {}", other))),
        }
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        if *locator == self.spinner {
            let visible = self.ajax_done() != Some(true);
            return Ok(ElementHandle::snapshot(locator, usize::from(visible)));
        }
        let count = self.positions.iter().filter(|(l, _)| l == locator).count();
        Ok(ElementHandle::snapshot(locator, count))
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        if element.locator == self.spinner {
            // the spinner hides one second after the request completes
            let hidden_after = self.ajax_done_after.unwrap_or_default() + Duration::from_secs(1);
            return Ok(self.age() < hidden_after);
        }
        Ok(true)
    }

    async fn position(&self, element: &ElementHandle) -> Result<Point> {
        self.positions
            .iter()
            .find(|(l, _)| *l == element.locator)
            .map(|(_, p)| *p)
            .ok_or_else(|| BrowserError::ElementNotFound {
                locator: element.to_string(),
            })
    }

    async fn perform(&self, ops: &[PointerOp]) -> Result<()> {
        self.performed.lock().unwrap().extend_from_slice(ops);
        Ok(())
    }
}

#[tokio::test]
async fn test_page_load_waits_for_every_phase() {
    let clock = Arc::new(ManualClock::default());
    let page = AdminPage::new(clock.clone());
    let idle = IdleWaitProtocol::new(&page, clock.as_ref(), Duration::from_secs(30));

    idle.wait_for_page_load(None).await.unwrap();

    // ajax drains at 2s, the grace second takes us to 3s, by which time the
    // spinner snapshot taken then is empty
    assert_eq!(clock.total_slept(), Duration::from_secs(3));
}

#[tokio::test]
async fn test_page_without_jquery_uses_fixed_wait() {
    let clock = Arc::new(ManualClock::default());
    let mut page = AdminPage::new(clock.clone());
    page.ajax_done_after = None;
    let idle = IdleWaitProtocol::new(&page, clock.as_ref(), Duration::from_secs(5));

    idle.wait_for_page_load(None).await.unwrap();

    let sleeps = clock.sleeps();
    // document-ready polling, then exactly one full-timeout fallback and the grace period
    assert!(sleeps.ends_with(&[Duration::from_secs(5), Duration::from_secs(1)]));
    assert_eq!(
        sleeps.iter().filter(|s| **s == Duration::from_secs(5)).count(),
        1
    );
}

#[tokio::test]
async fn test_spinner_snapshot_waits_until_hidden() {
    let clock = Arc::new(ManualClock::default());
    let page = AdminPage::new(clock.clone());
    let idle = IdleWaitProtocol::new(&page, clock.as_ref(), Duration::from_secs(30));

    // spinner is present now (ajax not done), hides at 3s
    idle.wait_for_loading_mask_to_disappear(None).await.unwrap();

    assert_eq!(clock.total_slept(), Duration::from_secs(3));
}

#[tokio::test]
async fn test_drag_with_offset_after_page_load() {
    let clock = Arc::new(ManualClock::default());
    let page = AdminPage::new(clock.clone());
    IdleWaitProtocol::new(&page, clock.as_ref(), Duration::from_secs(30))
        .wait_for_page_load(None)
        .await
        .unwrap();

    let source = Locator::xpath("//li[@data-id='4']/a");
    let target = Locator::xpath("//li[@data-id='2']/a");
    let ops = drag_and_drop(&page, &source, &target, Some(5.0), Some(5.0))
        .await
        .unwrap();

    assert_eq!(ops.len(), 6);
    assert_eq!(ops[4], PointerOp::move_by(45, 25));
    assert_eq!(*page.performed.lock().unwrap(), ops);
}

#[tokio::test]
async fn test_drag_to_missing_target_sends_nothing() {
    let clock = Arc::new(ManualClock::default());
    let page = AdminPage::new(clock.clone());

    let err = drag_and_drop(
        &page,
        &Locator::xpath("//li[@data-id='4']/a"),
        &Locator::xpath("//li[@data-id='99']/a"),
        None,
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BrowserError::ElementNotFound { .. }));
    assert!(page.performed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_open_category_page_then_drag() {
    let clock = Arc::new(ManualClock::default());
    let page = AdminPage::new(clock.clone());

    let url = am_on_page(
        &page,
        clock.as_ref(),
        "http://magento.local/",
        "/admin/catalog/category/",
        Duration::from_secs(30),
    )
    .await
    .unwrap();

    assert_eq!(url, "http://magento.local/admin/catalog/category/");
    assert_eq!(*page.visited.lock().unwrap(), vec![url]);
    assert_eq!(clock.total_slept(), Duration::from_secs(3));

    let ops = drag_and_drop(
        &page,
        &Locator::xpath("//li[@data-id='4']/a"),
        &Locator::xpath("//li[@data-id='2']/a"),
        None,
        None,
    )
    .await
    .unwrap();
    assert!(matches!(ops.last(), Some(PointerOp::Release(Some(_)))));
}
