use serde::Serialize;

use crate::timer::Timer;

/// Summed minutes for one task within a period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskTotal {
    pub task_hash: String,
    pub task_name: String,
    pub total_minutes: i64,
}

/// The running timer's contribution to a period, measured at query time.
#[derive(Clone, Debug, PartialEq)]
pub struct RunningTotal {
    pub timer: Timer,
    pub elapsed_minutes: i64,
}

/// Per-task totals over one reporting period.
///
/// Derived on demand, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodReport {
    pub period_name: String,
    pub tasks: Vec<TaskTotal>,
    pub running: Option<RunningTotal>,
    pub grand_total_minutes: i64,
}

/// Reduces finished timers into a `PeriodReport`.
///
/// Pure function of its inputs: no I/O, no hidden state. Timers group by
/// `task_hash`, in first-seen input order, so a report reads in the order
/// the work happened. Task names can change between sessions; the most
/// recently seen name within a group is the one displayed. The grand total
/// adds the running timer's elapsed minutes when the caller passes one.
///
/// Timers still running are skipped: their duration is undefined until stop.
pub fn summarize(
    period_name: &str,
    finished: &[Timer],
    running: Option<RunningTotal>,
) -> PeriodReport {
    let mut tasks: Vec<TaskTotal> = Vec::new();
    for timer in finished {
        let minutes = match timer.finished_minutes() {
            Some(minutes) => minutes,
            None => continue,
        };

        match tasks
            .iter_mut()
            .find(|task| task.task_hash == timer.task_hash)
        {
            Some(task) => {
                task.total_minutes += minutes;
                task.task_name = timer.task_name.clone();
            }
            None => tasks.push(TaskTotal {
                task_hash: timer.task_hash.clone(),
                task_name: timer.task_name.clone(),
                total_minutes: minutes,
            }),
        }
    }

    let grand_total_minutes = tasks.iter().map(|task| task.total_minutes).sum::<i64>()
        + running
            .as_ref()
            .map(|running| running.elapsed_minutes)
            .unwrap_or(0);

    PeriodReport {
        period_name: period_name.to_string(),
        tasks,
        running,
        grand_total_minutes,
    }
}
