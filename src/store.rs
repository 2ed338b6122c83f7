use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::error::TimerError;
use crate::timer::Timer;

/// Durable keyed storage of timer records.
///
/// The store is the only shared mutable resource of the core. It must
/// enforce at-most-one unfinished timer per (team, user) pair so that
/// concurrent starts race at this layer rather than in the lifecycle
/// manager.
#[cfg_attr(test, automock)]
pub trait TimerStore {
    /// Persists a new running timer.
    ///
    /// Fails with `TimerError::Conflict` when an unfinished timer already
    /// exists for the same (team, user) pair.
    fn create(&self, timer: &Timer) -> Result<(), TimerError>;

    /// Returns the user's unfinished timer, if any.
    fn find_running(&self, team_id: &str, user_id: &str) -> Result<Option<Timer>, TimerError>;

    /// Returns the timer with the given identity, or `TimerError::NotFound`.
    fn find_by_id(&self, id: &str) -> Result<Timer, TimerError>;

    /// Finished timers whose `created_at` falls within `[start, end)`.
    ///
    /// Running timers are excluded; callers fetch those via `find_running`.
    /// No ordering is guaranteed.
    fn list_by_user_and_range(
        &self,
        team_id: &str,
        user_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Timer>, TimerError>;

    /// Persists a stopped timer's finish instant and minutes.
    fn update(&self, timer: &Timer) -> Result<(), TimerError>;
}
