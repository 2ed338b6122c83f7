use chrono::{DateTime, Utc};
use log::info;

use crate::aggregate::{self, PeriodReport, RunningTotal};
use crate::datetime::day_bounds;
use crate::error::TimerError;
use crate::store::TimerStore;
use crate::timer::Timer;

/// Result of a start operation.
///
/// Starting never fails because a timer is already running: the previous
/// session is stopped first and returned here as `auto_stopped`, modeling a
/// task switch. Totals cover the finished timers of the UTC day containing
/// `now`.
#[derive(Debug, PartialEq)]
pub struct StartOutcome {
    pub started: Timer,
    pub started_task_total_for_today: i64,
    pub auto_stopped: Option<Timer>,
    pub stopped_task_total_for_today: Option<i64>,
    pub user_total_for_today: i64,
}

/// Result of a stop operation.
///
/// `stopped` is `None` when no timer was running; that is a reportable
/// outcome, not an error.
#[derive(Debug, PartialEq)]
pub struct StopOutcome {
    pub stopped: Option<Timer>,
    pub stopped_task_total_for_today: Option<i64>,
    pub user_total_for_today: i64,
}

/// Enforces the single-running-timer invariant per (team, user) pair and
/// owns every `Running -> Finished` transition.
///
/// The manager holds no locks across calls; correctness under concurrent
/// starts rests on the store rejecting a second unfinished insert for the
/// same pair.
pub struct TimerLifecycle<'a, S: TimerStore> {
    store: &'a S,
}

impl<'a, S: TimerStore> TimerLifecycle<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Starts timing a task, stopping any running timer first.
    ///
    /// A concurrent start for the same pair races at the store; the losing
    /// call recovers by retrying lookup-then-stop-then-create once. A second
    /// conflict surfaces as `StoreUnavailable`.
    pub fn start(
        &self,
        team_id: &str,
        user_id: &str,
        project_id: &str,
        task_hash: &str,
        task_name: &str,
        now: &DateTime<Utc>,
    ) -> Result<StartOutcome, TimerError> {
        let mut auto_stopped = self.stop_running(team_id, user_id, now)?;

        let started = Timer::start(team_id, project_id, user_id, task_hash, task_name, now);
        match self.store.create(&started) {
            Ok(()) => {}
            Err(TimerError::Conflict) => {
                info!(
                    "Concurrent start detected for {}/{}, retrying",
                    team_id, user_id
                );
                if let Some(stopped) = self.stop_running(team_id, user_id, now)? {
                    auto_stopped = Some(stopped);
                }
                self.store.create(&started).map_err(|err| match err {
                    TimerError::Conflict => TimerError::StoreUnavailable(format!(
                        "start kept conflicting for {}/{}",
                        team_id, user_id
                    )),
                    other => other,
                })?;
            }
            Err(other) => return Err(other),
        }
        info!("Started timer {} for task {}", started.id, task_name);

        let today = self.finished_today(team_id, user_id, now)?;
        Ok(StartOutcome {
            started_task_total_for_today: task_total(&today, task_hash),
            stopped_task_total_for_today: auto_stopped
                .as_ref()
                .map(|stopped| task_total(&today, &stopped.task_hash)),
            user_total_for_today: user_total(&today),
            started,
            auto_stopped,
        })
    }

    /// Stops the running timer, if any, recording its floored duration.
    pub fn stop(
        &self,
        team_id: &str,
        user_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<StopOutcome, TimerError> {
        let stopped = self.stop_running(team_id, user_id, now)?;

        let today = self.finished_today(team_id, user_id, now)?;
        Ok(StopOutcome {
            stopped_task_total_for_today: stopped
                .as_ref()
                .map(|stopped| task_total(&today, &stopped.task_hash)),
            user_total_for_today: user_total(&today),
            stopped,
        })
    }

    /// Today's report: finished-task totals plus a live snapshot of the
    /// running timer. Read-only; nothing is persisted.
    pub fn status(
        &self,
        team_id: &str,
        user_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<PeriodReport, TimerError> {
        let (start, end) = day_bounds(now);
        self.report_for_range(team_id, user_id, "today", &start, &end, now)
    }

    /// Report over an arbitrary caller-specified `[start, end)` window.
    pub fn period_report(
        &self,
        team_id: &str,
        user_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        now: &DateTime<Utc>,
    ) -> Result<PeriodReport, TimerError> {
        if start > end {
            return Err(TimerError::InvalidRange {
                start: *start,
                end: *end,
            });
        }

        let period_name = format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
        self.report_for_range(team_id, user_id, &period_name, start, end, now)
    }

    fn report_for_range(
        &self,
        team_id: &str,
        user_id: &str,
        period_name: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        now: &DateTime<Utc>,
    ) -> Result<PeriodReport, TimerError> {
        let finished = self
            .store
            .list_by_user_and_range(team_id, user_id, start, end)?;
        // A running timer participates only when it started inside the
        // window; its duration stays unpersisted until stop.
        let running = self
            .store
            .find_running(team_id, user_id)?
            .filter(|timer| timer.created_at >= *start && timer.created_at < *end)
            .map(|timer| RunningTotal {
                elapsed_minutes: timer.elapsed_minutes(now),
                timer,
            });

        Ok(aggregate::summarize(period_name, &finished, running))
    }

    fn stop_running(
        &self,
        team_id: &str,
        user_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<Option<Timer>, TimerError> {
        let running = self.store.find_running(team_id, user_id)?;
        match running {
            None => Ok(None),
            Some(mut timer) => {
                timer.finish(now);
                self.store.update(&timer)?;
                if let Some(minutes) = timer.finished_minutes() {
                    info!("Stopped timer {} after {} minutes", timer.id, minutes);
                }
                Ok(Some(timer))
            }
        }
    }

    fn finished_today(
        &self,
        team_id: &str,
        user_id: &str,
        now: &DateTime<Utc>,
    ) -> Result<Vec<Timer>, TimerError> {
        let (start, end) = day_bounds(now);
        self.store
            .list_by_user_and_range(team_id, user_id, &start, &end)
    }
}

fn task_total(timers: &[Timer], task_hash: &str) -> i64 {
    timers
        .iter()
        .filter(|timer| timer.task_hash == task_hash)
        .filter_map(Timer::finished_minutes)
        .sum()
}

fn user_total(timers: &[Timer]) -> i64 {
    timers.iter().filter_map(Timer::finished_minutes).sum()
}
