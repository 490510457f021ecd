//! Throttled cron runs
//!
//! The application's cron refuses to pick up a group again until a minute
//! after its last run, so dispatching `cron:run` twice in quick succession
//! silently does nothing the second time. [`CronThrottleScheduler`] remembers
//! when each group last ran and sleeps off the rest of the interval before
//! dispatching again.
//!
//! A run without groups runs every group, so it is tracked under
//! [`GroupKey::All`] and throttles named runs too.

use crate::bridge::CommandExecutor;
use chrono::{DateTime, Utc};
use mftf_core::{Clock, MftfConfig, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Console command that runs the cron
pub const CRON_COMMAND: &str = "cron:run";

/// Minimum time between two runs touching the same group
pub const DEFAULT_CRON_INTERVAL: Duration = Duration::from_secs(60);

/// Key of a last-run entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// A run that was not restricted to any group
    All,
    Named(String),
}

/// Runs cron through a [`CommandExecutor`], keeping runs an interval apart
///
/// # Example
///
/// ```no_run
/// use mftf_core::{MftfConfig, SystemClock};
/// use mftf_remote::{CliBridge, CronThrottleScheduler, EnvToken};
/// use std::sync::Arc;
///
/// # async fn example() -> mftf_core::Result<()> {
/// let config = MftfConfig::load_or_default(std::path::Path::new("."))?;
/// let bridge = CliBridge::from_config(&config, Arc::new(EnvToken))?;
/// let mut cron = CronThrottleScheduler::new(Arc::new(bridge), Arc::new(SystemClock));
///
/// cron.run_cron(Some("index"), None, None).await?;
/// // sleeps until a minute has passed since the first run finished
/// cron.run_cron(Some("index"), None, None).await?;
/// # Ok(())
/// # }
/// ```
pub struct CronThrottleScheduler {
    executor: Arc<dyn CommandExecutor>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_dispatch: HashMap<GroupKey, DateTime<Utc>>,
}

impl CronThrottleScheduler {
    pub fn new(executor: Arc<dyn CommandExecutor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executor,
            clock,
            interval: DEFAULT_CRON_INTERVAL,
            last_dispatch: HashMap::new(),
        }
    }

    /// Use the interval configured in `cron_interval_secs`
    pub fn from_config(
        config: &MftfConfig,
        executor: Arc<dyn CommandExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(executor, clock).with_interval(config.cron_interval())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When a run touching `key` last finished
    pub fn last_dispatch(&self, key: &GroupKey) -> Option<DateTime<Utc>> {
        self.last_dispatch.get(key).copied()
    }

    /// Run cron for a space separated list of groups; `None` or blank runs all groups
    pub async fn run_cron(
        &mut self,
        groups: Option<&str>,
        timeout: Option<u64>,
        arguments: Option<&str>,
    ) -> Result<String> {
        let groups: Vec<&str> = groups.unwrap_or_default().split_whitespace().collect();
        self.run_cron_groups(&groups, timeout, arguments).await
    }

    /// Run cron for `groups` (all groups when empty), waiting out the interval first
    ///
    /// Returns the command output followed by the time spent waiting and
    /// executing. The run is recorded even when the dispatch fails.
    pub async fn run_cron_groups<S: AsRef<str>>(
        &mut self,
        groups: &[S],
        timeout: Option<u64>,
        arguments: Option<&str>,
    ) -> Result<String> {
        let groups: Vec<String> = groups
            .iter()
            .map(|g| g.as_ref().trim())
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        let wait = self.wait_for(&groups);
        if !wait.is_zero() {
            info!(
                "Waiting {:.2}s before running cron (interval: {:?})",
                wait.as_secs_f64(),
                self.interval
            );
            self.clock.sleep(wait).await;
        }

        let command = build_command(&groups);
        debug!("Dispatching {}", command);

        let started = self.clock.now();
        let result = self.executor.execute(&command, timeout, arguments).await;
        let execution = self.clock.elapsed_since(started);

        self.record_finished(&groups);

        let output = result.map_err(|e| {
            warn!("Cron dispatch failed after {:.2}s: {}", execution.as_secs_f64(), e);
            e
        })?;

        Ok(format!(
            "{} (wait: {:.2}s, execution: {:.2}s)",
            output,
            wait.as_secs_f64(),
            execution.as_secs_f64()
        ))
    }

    /// How long a run for `groups` would have to wait right now
    ///
    /// Named groups are throttled by their own last run and by the last
    /// all-groups run. An all-groups run is throttled by every recorded run.
    pub fn wait_for(&self, groups: &[String]) -> Duration {
        let last_relevant = if groups.is_empty() {
            self.last_dispatch.values().max().copied()
        } else {
            groups
                .iter()
                .map(|g| GroupKey::Named(g.clone()))
                .chain(std::iter::once(GroupKey::All))
                .filter_map(|key| self.last_dispatch.get(&key))
                .max()
                .copied()
        };

        match last_relevant {
            Some(last) => self
                .interval
                .saturating_sub(self.clock.elapsed_since(last)),
            None => Duration::ZERO,
        }
    }

    fn record_finished(&mut self, groups: &[String]) {
        let finished = self.clock.now();
        if groups.is_empty() {
            self.last_dispatch.insert(GroupKey::All, finished);
        } else {
            for group in groups {
                self.last_dispatch
                    .insert(GroupKey::Named(group.clone()), finished);
            }
        }
    }
}

/// `cron:run` followed by one `--group=<name>` per group, in order
pub fn build_command(groups: &[String]) -> String {
    groups.iter().fold(CRON_COMMAND.to_string(), |mut command, group| {
        command.push_str(" --group=");
        command.push_str(group);
        command
    })
}
