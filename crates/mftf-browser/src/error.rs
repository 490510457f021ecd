//! Browser error types - re-exports unified MftfError from mftf-core
//!
//! Browser-side failures map onto these MftfError variants:
//! - Browser(String) - launch, navigation, CDP input dispatch
//! - Script(String) - a page script threw or returned something unreadable
//! - ElementNotFound / AmbiguousLocator - locator resolution for actions
//!
//! Error messages should say which locator or script was involved.

pub use mftf_core::{MftfError, Result};

// Browser-flavoured alias used throughout this crate
pub type BrowserError = MftfError;
