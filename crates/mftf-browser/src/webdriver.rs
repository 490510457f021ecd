//! The slice of a WebDriver session the helpers need
//!
//! Anything that can run a script, count and inspect elements, and replay a
//! pointer gesture can drive the idle-wait protocol and drag helpers. The
//! CDP-backed [`BrowserSession`](crate::browser::BrowserSession) is the
//! production implementation; tests use in-memory fakes.

use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use mftf_core::{ElementHandle, Locator, Point, PointerOp};
use serde_json::Value;
use tracing::debug;

/// Session primitives consumed by the idle-wait and drag helpers
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Load `url` in the current tab and wait for the navigation to commit
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value
    ///
    /// A script that throws must surface as [`BrowserError::Script`].
    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Positional handles for every element currently matching `locator`
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Whether the element at the handle's position is displayed
    ///
    /// A handle whose position no longer resolves is reported as not visible.
    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    /// Top-left corner of the element in page coordinates
    async fn position(&self, element: &ElementHandle) -> Result<Point>;

    /// Replay a pointer gesture in order
    async fn perform(&self, ops: &[PointerOp]) -> Result<()>;
}

/// Evaluate a script expected to produce a boolean
///
/// Non-boolean results count as `false`, like a falsy JS value would.
pub async fn eval_bool(driver: &dyn WebDriver, script: &str) -> Result<bool> {
    let value = driver.execute_script(script).await?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Resolve a locator that must match exactly one element
///
/// # Errors
/// - [`BrowserError::ElementNotFound`] when nothing matches
/// - [`BrowserError::AmbiguousLocator`] when more than one element matches
pub async fn match_single_or_fail(
    driver: &dyn WebDriver,
    locator: &Locator,
) -> Result<ElementHandle> {
    let mut matches = driver.find_elements(locator).await?;

    match matches.len() {
        0 => Err(BrowserError::ElementNotFound {
            locator: locator.to_string(),
        }),
        1 => {
            let handle = matches.remove(0);
            debug!("Resolved {} to {}", locator, handle);
            Ok(handle)
        }
        count => Err(BrowserError::AmbiguousLocator {
            locator: locator.to_string(),
            count,
        }),
    }
}
