use std::io::Write;

use anyhow::{Context, Result};

use crate::report::{PeriodSummary, StartReport, StopReport};

/// Renders reports for the terminal.
///
/// One of possibly many themes over the same report shapes; the shapes
/// themselves carry no markup.
pub trait ConsolePresenter {
    fn show_start(&mut self, report: &StartReport) -> Result<()>;
    fn show_stop(&mut self, report: &StopReport) -> Result<()>;
    fn show_period(&mut self, summary: &PeriodSummary) -> Result<()>;
}

/// Renders reports as Markdown lists.
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// Returns a new `ConsoleMarkdownList`.
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    fn show_start(&mut self, report: &StartReport) -> Result<()> {
        if let Some(stopped) = &report.stopped_timer {
            writeln!(
                self.writer,
                "- completed: {} {}",
                format_minutes(report.stopped_task_total_for_today.unwrap_or(0)),
                stopped.task_name
            )
            .context("Failed to write stopped timer")?;
        }
        writeln!(
            self.writer,
            "- started: {} {}",
            format_minutes(report.started_task_total_for_today),
            report.started_timer.task_name
        )
        .context("Failed to write started timer")?;
        writeln!(
            self.writer,
            "- total for today: {}",
            format_minutes(report.user_total_for_today)
        )
        .context("Failed to write total")?;

        Ok(())
    }

    fn show_stop(&mut self, report: &StopReport) -> Result<()> {
        match &report.stopped_timer {
            Some(stopped) => writeln!(
                self.writer,
                "- completed: {} {}",
                format_minutes(report.stopped_task_total_for_today.unwrap_or(0)),
                stopped.task_name
            )
            .context("Failed to write stopped timer")?,
            None => writeln!(self.writer, "- no timer is running")
                .context("Failed to write no-timer line")?,
        }
        writeln!(
            self.writer,
            "- total for today: {}",
            format_minutes(report.user_total_for_today)
        )
        .context("Failed to write total")?;

        Ok(())
    }

    fn show_period(&mut self, summary: &PeriodSummary) -> Result<()> {
        if summary.tasks.is_empty() && summary.running_timer.is_none() {
            writeln!(
                self.writer,
                "You have no tasks completed {}",
                summary.period_name
            )
            .context("Failed to write empty period")?;
            return Ok(());
        }

        writeln!(self.writer, "## {}", summary.period_name).context("Failed to write header")?;
        for task in &summary.tasks {
            writeln!(
                self.writer,
                "- {} {}",
                format_minutes(task.total_minutes),
                task.task_name
            )
            .with_context(|| format!("Failed to write task {}", task.task_name))?;
        }
        if let Some(running) = &summary.running_timer {
            writeln!(
                self.writer,
                "- {} {} (running)",
                format_minutes(running.elapsed_minutes),
                running.timer.task_name
            )
            .context("Failed to write running timer")?;
        }
        writeln!(
            self.writer,
            "- total for {}: {}",
            summary.period_name,
            format_minutes(summary.grand_total_minutes)
        )
        .context("Failed to write total")?;

        Ok(())
    }
}

/// Formats a minute count as "37m" or "2h 05m".
fn format_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let remainder = minutes % 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, remainder)
    } else {
        format!("{}m", remainder)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::format_minutes;
    use super::ConsoleMarkdownList;
    use super::ConsolePresenter;
    use crate::aggregate::{summarize, RunningTotal};
    use crate::lifecycle::{StartOutcome, StopOutcome};
    use crate::report::{period_summary, start_report, stop_report};
    use crate::timer::Timer;

    fn finished_timer(task_hash: &str, task_name: &str, minutes: i64) -> Timer {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let mut timer =
            Timer::start("team-1", "project-1", "user-1", task_hash, task_name, &created_at);
        timer.finish(&(created_at + Duration::minutes(minutes)));
        timer
    }

    fn running_timer(task_hash: &str, task_name: &str) -> Timer {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        Timer::start("team-1", "project-1", "user-1", task_hash, task_name, &created_at)
    }

    #[rstest]
    #[case(0, "0m")]
    #[case(5, "5m")]
    #[case(59, "59m")]
    #[case(60, "1h 00m")]
    #[case(75, "1h 15m")]
    #[case(125, "2h 05m")]
    fn test_format_minutes(#[case] minutes: i64, #[case] expected: &str) {
        assert_eq!(format_minutes(minutes), expected);
    }

    #[test]
    fn test_show_start_with_auto_stopped_timer() {
        let outcome = StartOutcome {
            started: running_timer("hash-b", "Task B"),
            started_task_total_for_today: 0,
            auto_stopped: Some(finished_timer("hash-a", "Task A", 10)),
            stopped_task_total_for_today: Some(10),
            user_total_for_today: 10,
        };
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_start(&start_report(&outcome)).unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- completed: 10m Task A\n- started: 0m Task B\n- total for today: 10m\n"
        );
    }

    #[test]
    fn test_show_stop_without_running_timer() {
        let outcome = StopOutcome {
            stopped: None,
            stopped_task_total_for_today: None,
            user_total_for_today: 25,
        };
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_stop(&stop_report(&outcome)).unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- no timer is running\n- total for today: 25m\n"
        );
    }

    #[test]
    fn test_show_period_with_tasks_and_running_timer() {
        let finished = vec![finished_timer("hash-a", "Bug fix", 25)];
        let running = RunningTotal {
            timer: running_timer("hash-b", "Review"),
            elapsed_minutes: 12,
        };
        let summary = period_summary(&summarize("today", &finished, Some(running)));
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_period(&summary).unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "## today\n- 25m Bug fix\n- 12m Review (running)\n- total for today: 37m\n"
        );
    }

    #[test]
    fn test_show_period_empty() {
        let summary = period_summary(&summarize("today", &[], None));
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_period(&summary).unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "You have no tasks completed today\n"
        );
    }
}
