//! # mftf-core
//!
//! Shared building blocks for the mftf admin-UI test helpers.
//!
//! The helper layer drives a web application's administrative UI through a
//! WebDriver-style session and talks to the backend through a CLI bridge.
//! Everything in here is used by more than one of the sibling crates:
//!
//! - [`MftfError`] / [`Result`]: the one error type every crate returns
//! - [`MftfConfig`]: suite configuration (base URL, timeouts, CLI bridge)
//! - [`Clock`]: time source and sleeper, swappable for [`ManualClock`] in tests
//! - [`Locator`], [`ElementHandle`], [`Point`], [`PointerOp`]: the vocabulary
//!   shared by the browser session and the action helpers

pub mod clock;
pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{timeout_from_secs, AdminCredentials, CliBridgeConfig, MftfConfig};
pub use error::{MftfError, Result};
pub use types::*;
