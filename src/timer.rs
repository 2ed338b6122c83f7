use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Whether a timer is still running or has been stopped.
///
/// A stopped timer carries its finish instant and its persisted duration, so
/// `minutes` cannot be read from a timer that is still running.
#[derive(Clone, Debug, PartialEq)]
pub enum TimerState {
    Running,
    Finished {
        finished_at: DateTime<Utc>,
        minutes: i64,
    },
}

/// One work session of a user on a task.
///
/// All fields except `state` are set once at creation and never change.
/// The lifecycle manager is the only writer of `state`, and transitions it
/// exactly once, from `Running` to `Finished`.
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    pub id: String,
    pub team_id: String,
    pub project_id: String,
    pub user_id: String,
    pub task_hash: String,
    pub task_name: String,
    pub created_at: DateTime<Utc>,
    pub state: TimerState,
}

impl Timer {
    /// Returns a new running timer with a fresh identity.
    pub fn start(
        team_id: &str,
        project_id: &str,
        user_id: &str,
        task_hash: &str,
        task_name: &str,
        created_at: &DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            task_hash: task_hash.to_string(),
            task_name: task_name.to_string(),
            created_at: *created_at,
            state: TimerState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Whole minutes elapsed since the timer started, floored, never
    /// negative.
    ///
    /// Durations are always derived from the two wall-clock instants, never
    /// accumulated incrementally.
    pub fn elapsed_minutes(&self, now: &DateTime<Utc>) -> i64 {
        (*now - self.created_at).num_minutes().max(0)
    }

    /// Stops the timer, recording the finish instant and the floored
    /// duration.
    pub fn finish(&mut self, now: &DateTime<Utc>) {
        self.state = TimerState::Finished {
            finished_at: *now,
            minutes: self.elapsed_minutes(now),
        };
    }

    /// The persisted duration, or `None` while the timer is running.
    pub fn finished_minutes(&self) -> Option<i64> {
        match self.state {
            TimerState::Running => None,
            TimerState::Finished { minutes, .. } => Some(minutes),
        }
    }
}

/// Derives the stable task identifier from a project and a task name.
///
/// The hash keys aggregation groups, so reports survive display-name edits
/// as long as the underlying source name is stable.
pub fn task_hash(project_id: &str, task_name: &str) -> String {
    let digest = Sha256::digest(format!("{}/{}", project_id, task_name).as_bytes());
    digest
        .iter()
        .take(8)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::task_hash;
    use super::Timer;
    use super::TimerState;

    fn dummy_timer() -> Timer {
        Timer::start(
            "team-1",
            "project-1",
            "user-1",
            "hash-1",
            "Bug fix",
            &Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        )
    }

    /// The elapsed duration is floored to whole minutes and clamped at 0.
    #[rstest]
    #[case::zero(Duration::seconds(0), 0)]
    #[case::half_minute(Duration::seconds(30), 0)]
    #[case::just_under_a_minute(Duration::seconds(59), 0)]
    #[case::exactly_a_minute(Duration::seconds(60), 1)]
    #[case::thirty_seven_minutes(Duration::minutes(37), 37)]
    #[case::just_under_an_hour(Duration::seconds(59 * 60 + 54), 59)]
    #[case::clock_skew(Duration::seconds(-30), 0)]
    fn test_elapsed_minutes(#[case] elapsed: Duration, #[case] expected: i64) {
        let timer = dummy_timer();
        let now = timer.created_at + elapsed;

        assert_eq!(timer.elapsed_minutes(&now), expected);
    }

    #[test]
    fn test_finish_records_instant_and_minutes() {
        let mut timer = dummy_timer();
        let now = timer.created_at + Duration::minutes(37);

        timer.finish(&now);

        assert!(!timer.is_running());
        assert_eq!(
            timer.state,
            TimerState::Finished {
                finished_at: now,
                minutes: 37,
            }
        );
        assert_eq!(timer.finished_minutes(), Some(37));
    }

    #[test]
    fn test_finish_immediately_is_a_zero_minute_timer() {
        let mut timer = dummy_timer();
        let now = timer.created_at;

        timer.finish(&now);

        assert_eq!(timer.finished_minutes(), Some(0));
    }

    #[test]
    fn test_new_timer_is_running() {
        let timer = dummy_timer();

        assert!(timer.is_running());
        assert_eq!(timer.finished_minutes(), None);
    }

    /// The hash is stable for the same input and distinguishes projects.
    #[test]
    fn test_task_hash() {
        assert_eq!(
            task_hash("project-1", "Bug fix"),
            task_hash("project-1", "Bug fix")
        );
        assert_ne!(
            task_hash("project-1", "Bug fix"),
            task_hash("project-2", "Bug fix")
        );
        assert_eq!(task_hash("project-1", "Bug fix").len(), 16);
    }
}
