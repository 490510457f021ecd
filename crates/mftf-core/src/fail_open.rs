//! Fail-open utilities for graceful degradation
//!
//! Some page instrumentation is optional: a page may not ship the library a
//! check relies on, or a check script may throw. These helpers turn such a
//! failure into a logged diagnostic plus a fallback instead of an error.
//!
//! DO NOT use fail-open for:
//! - Backend dispatch (transport errors must reach the caller)
//! - Configuration loading
//! - Locator resolution for actions (a missing element is a test failure)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Await an operation that is allowed to fail
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use mftf_core::fail_open::fail_open;
/// use mftf_core::Result;
///
/// async fn check_ajax() -> Result<bool> {
///     Ok(true)
/// }
///
/// async fn example() {
///     let drained = fail_open("ajax idle check", check_ajax()).await;
///     // drained is None if the check itself failed
/// }
/// ```
pub async fn fail_open<Fut, T>(operation_name: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Like [`fail_open`], but runs `fallback` when the operation fails
///
/// The fallback cannot fail; whatever it produces replaces the failed value.
pub async fn fail_open_or_else<Fut, F, FFut, T>(operation_name: &str, fut: Fut, fallback: F) -> T
where
    Fut: Future<Output = Result<T>>,
    F: FnOnce() -> FFut,
    FFut: Future<Output = T>,
{
    match fail_open(operation_name, fut).await {
        Some(val) => val,
        None => fallback().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MftfError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("idle check", async { Ok::<_, MftfError>(true) }).await;
        assert_eq!(result, Some(true));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("idle check", async {
            Err::<bool, _>(MftfError::Script("jQuery is not defined".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fallback_not_run_on_success() {
        let mut fallback_ran = false;
        let value = fail_open_or_else("idle check", async { Ok::<_, MftfError>(7) }, || {
            fallback_ran = true;
            async { 0 }
        })
        .await;
        assert_eq!(value, 7);
        assert!(!fallback_ran);
    }

    #[tokio::test]
    async fn test_fallback_runs_on_failure() {
        let value = fail_open_or_else(
            "idle check",
            async { Err::<i32, _>(MftfError::Script("boom".to_string())) },
            || async { -1 },
        )
        .await;
        assert_eq!(value, -1);
    }
}
