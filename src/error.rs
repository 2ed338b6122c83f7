use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the timer core.
///
/// Every operation returns `Result<_, TimerError>`; callers branch on the
/// kind to decide user-facing messaging.
#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    /// The referenced timer does not exist.
    #[error("timer not found: {0}")]
    NotFound(String),

    /// An unfinished timer already exists for the (team, user) pair.
    ///
    /// Raised by the store when a concurrent start wins the race; the
    /// lifecycle manager recovers from it with a single retry.
    #[error("an unfinished timer already exists for this team and user")]
    Conflict,

    /// The underlying storage call failed or timed out. No partial state is
    /// left behind.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    /// A range query was issued with start after end.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
