//! Locating the run created by a workflow dispatch.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::github::WorkflowRun;
use crate::metrics;

use super::types::Environment;

/// Most recent run created at or after `since` whose lowercased name contains
/// the environment tag.
///
/// Runs without a timestamp are skipped; ties keep provider order.
pub fn select_triggered_run(
    runs: &[WorkflowRun],
    env: Environment,
    since: DateTime<Utc>,
) -> Option<&WorkflowRun> {
    runs.iter()
        .rev()
        .filter(|run| run.created_at.is_some_and(|created| created >= since))
        .filter(|run| {
            run.name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(env.tag()))
        })
        .max_by_key(|run| run.created_at)
}

/// Wait-then-poll schedule used after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Wait before the first lookup.
    pub initial_delay: Duration,
    /// First wait between lookups; doubles after each miss.
    pub interval: Duration,
    /// Total budget for lookups after the initial delay.
    pub timeout: Duration,
    /// Allowed lag of upstream run timestamps behind the local clock.
    pub clock_skew: Duration,
}

impl PollSchedule {
    /// Build the schedule from config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.trigger_initial_delay_ms),
            interval: Duration::from_millis(config.trigger_poll_interval_ms),
            timeout: Duration::from_millis(config.trigger_poll_timeout_ms),
            clock_skew: Duration::from_millis(config.trigger_clock_skew_ms),
        }
    }

    /// Earliest creation time a run dispatched at `dispatched_at` may report.
    pub fn cutoff(&self, dispatched_at: DateTime<Utc>) -> DateTime<Utc> {
        let skew = chrono::Duration::from_std(self.clock_skew)
            .unwrap_or_else(|_| chrono::Duration::zero());
        dispatched_at
            .checked_sub_signed(skew)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Run `lookup` on the schedule until it yields a run or the budget is spent.
///
/// Errors from `lookup` end polling immediately.
pub async fn poll_for_run<F, Fut, E>(
    schedule: PollSchedule,
    mut lookup: F,
) -> Result<Option<WorkflowRun>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<WorkflowRun>, E>>,
{
    tokio::time::sleep(schedule.initial_delay).await;

    let deadline = Instant::now() + schedule.timeout;
    let mut interval = schedule.interval;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        metrics::inc_trigger_lookups();

        if let Some(run) = lookup().await? {
            debug!(attempt, run_id = run.id, "Triggered run located");
            return Ok(Some(run));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(attempt, "Lookup budget exhausted");
            return Ok(None);
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = interval.saturating_mul(2);
    }
}
