//! Page synchronization and pointer gestures for admin-UI browser tests
//!
//! This crate provides the browser-side half of the mftf helpers: waiting for
//! an admin page to settle, and dragging one element onto another, on top of
//! any session that implements [`WebDriver`].
//!
//! # Features
//!
//! - **Idle wait**: document ready, jQuery ajax drained, loading masks gone
//! - **Drag and drop**: offset or element drops with the corrective jitter step
//! - **Navigation**: open a page and wait for it in one call
//! - **CDP session**: a `headless_chrome` backed [`BrowserSession`]
//!
//! # Example
//!
//! ```no_run
//! use mftf_browser::browser::BrowserSession;
//! use mftf_browser::drag::drag_and_drop;
//! use mftf_browser::idle::IdleWaitProtocol;
//! use mftf_core::{Locator, SystemClock};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = BrowserSession::launch().await?;
//!     session.navigate("http://magento.local/admin/catalog/category/").await?;
//!
//!     let idle = IdleWaitProtocol::new(&session, &SystemClock, Duration::from_secs(30));
//!     idle.wait_for_page_load(None).await?;
//!
//!     drag_and_drop(
//!         &session,
//!         &Locator::xpath("//li[@data-id='4']/a"),
//!         &Locator::xpath("//li[@data-id='2']/a"),
//!         Some(0.0),
//!         Some(12.0),
//!     )
//!     .await?;
//!
//!     idle.wait_for_page_load(None).await?;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`webdriver`]: the session trait and locator resolution helpers
//! - [`idle`]: the three-phase idle-wait protocol
//! - [`drag`]: drag gesture geometry and execution
//! - [`navigation`]: page URL resolution and `am_on_page`
//! - [`browser`]: Chrome DevTools Protocol session
//! - [`error`]: error re-exports

pub mod browser;
pub mod drag;
pub mod error;
pub mod idle;
pub mod navigation;
pub mod webdriver;

// Re-export commonly used types
pub use browser::{BrowserConfig, BrowserSession};
pub use drag::{compute_drag_sequence, drag_and_drop};
pub use error::{BrowserError, Result};
pub use idle::{IdleWaitProtocol, PollOutcome, LOADING_MASK_LOCATORS};
pub use navigation::{am_on_page, resolve_page_url};
pub use webdriver::{match_single_or_fail, WebDriver};
