use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{PeriodReport, TaskTotal};
use crate::lifecycle::{StartOutcome, StopOutcome};
use crate::timer::{Timer, TimerState};

/// A timer as presentation layers and the frontend see it: the persisted
/// record layout, with the finish fields nullable while running.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimerView {
    pub id: String,
    pub team_id: String,
    pub project_id: String,
    pub user_id: String,
    pub task_hash: String,
    pub task_name: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub minutes: Option<i64>,
}

impl From<&Timer> for TimerView {
    fn from(timer: &Timer) -> Self {
        let (finished_at, minutes) = match timer.state {
            TimerState::Running => (None, None),
            TimerState::Finished {
                finished_at,
                minutes,
            } => (Some(finished_at), Some(minutes)),
        };

        Self {
            id: timer.id.clone(),
            team_id: timer.team_id.clone(),
            project_id: timer.project_id.clone(),
            user_id: timer.user_id.clone(),
            task_hash: timer.task_hash.clone(),
            task_name: timer.task_name.clone(),
            created_at: timer.created_at,
            finished_at,
            minutes,
        }
    }
}

/// Snapshot of the running timer with its elapsed minutes at query time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunningView {
    pub timer: TimerView,
    pub elapsed_minutes: i64,
}

/// Response shape of the start command.
#[derive(Debug, PartialEq, Serialize)]
pub struct StartReport {
    pub started_timer: TimerView,
    pub started_task_total_for_today: i64,
    pub stopped_timer: Option<TimerView>,
    pub stopped_task_total_for_today: Option<i64>,
    pub user_total_for_today: i64,
}

/// Response shape of the stop command.
#[derive(Debug, PartialEq, Serialize)]
pub struct StopReport {
    pub stopped_timer: Option<TimerView>,
    pub stopped_task_total_for_today: Option<i64>,
    pub user_total_for_today: i64,
}

/// Response shape of the status command and of the frontend range report.
#[derive(Debug, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period_name: String,
    pub tasks: Vec<TaskTotal>,
    pub running_timer: Option<RunningView>,
    pub grand_total_minutes: i64,
}

/// Field selection only; every number here was computed upstream.
pub fn start_report(outcome: &StartOutcome) -> StartReport {
    StartReport {
        started_timer: TimerView::from(&outcome.started),
        started_task_total_for_today: outcome.started_task_total_for_today,
        stopped_timer: outcome.auto_stopped.as_ref().map(TimerView::from),
        stopped_task_total_for_today: outcome.stopped_task_total_for_today,
        user_total_for_today: outcome.user_total_for_today,
    }
}

pub fn stop_report(outcome: &StopOutcome) -> StopReport {
    StopReport {
        stopped_timer: outcome.stopped.as_ref().map(TimerView::from),
        stopped_task_total_for_today: outcome.stopped_task_total_for_today,
        user_total_for_today: outcome.user_total_for_today,
    }
}

pub fn period_summary(report: &PeriodReport) -> PeriodSummary {
    PeriodSummary {
        period_name: report.period_name.clone(),
        tasks: report.tasks.clone(),
        running_timer: report.running.as_ref().map(|running| RunningView {
            timer: TimerView::from(&running.timer),
            elapsed_minutes: running.elapsed_minutes,
        }),
        grand_total_minutes: report.grand_total_minutes,
    }
}
