//! # mftf-remote
//!
//! Backend side of the mftf helpers: everything that reaches the application
//! over HTTP instead of through the browser.
//!
//! - [`auth`]: where the admin token sent with every bridge call comes from
//! - [`bridge`]: the [`CommandExecutor`] trait and its HTTP implementation,
//!   [`CliBridge`], which runs console commands through the exposed entrypoint
//! - [`cron`]: [`CronThrottleScheduler`], which keeps consecutive cron runs at
//!   least one interval apart per group
//! - [`web_api`]: [`WebApiClient`] for authenticated REST calls such as
//!   deleting an entity by URL
//!
//! ## Key Pattern
//!
//! The scheduler never talks HTTP itself. It is handed a `CommandExecutor`,
//! so tests drive it with an in-memory executor and a manual clock.

pub mod auth;
pub mod bridge;
pub mod cron;
pub mod web_api;

pub use auth::{AdminTokenProvider, EnvToken, StaticToken, WebApiAuth, ADMIN_TOKEN_ENV};
pub use bridge::{clean_output, endpoint_url, CliBridge, CommandExecutor, NO_OUTPUT};
pub use cron::{CronThrottleScheduler, GroupKey, CRON_COMMAND, DEFAULT_CRON_INTERVAL};
pub use web_api::WebApiClient;
