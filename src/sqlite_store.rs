use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TimerError;
use crate::store::TimerStore;
use crate::timer::{Timer, TimerState};

/// The partial unique index is the single-running-timer invariant: a second
/// unfinished insert for the same (team, user) pair fails at this layer no
/// matter how many service instances share the database.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS timers (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    task_hash TEXT NOT NULL,
    task_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    finished_at TEXT,
    minutes INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_timers_one_running
    ON timers(team_id, user_id) WHERE finished_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_timers_user_created
    ON timers(team_id, user_id, created_at);
";

const TIMER_COLUMNS: &str =
    "id, team_id, project_id, user_id, task_hash, task_name, created_at, finished_at, minutes";

/// SQLite-backed `TimerStore`.
pub struct SqliteTimerStore {
    conn: Connection,
}

impl SqliteTimerStore {
    /// Opens (and bootstraps) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, TimerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| TimerError::StoreUnavailable(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(store_error)?;
        info!("Opened timer database at {}", path.display());
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self, TimerError> {
        let conn = Connection::open_in_memory().map_err(store_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, TimerError> {
        conn.execute_batch(SCHEMA).map_err(store_error)?;
        Ok(Self { conn })
    }
}

impl TimerStore for SqliteTimerStore {
    fn create(&self, timer: &Timer) -> Result<(), TimerError> {
        let (finished_at, minutes) = finish_columns(timer);
        self.conn
            .execute(
                "INSERT INTO timers (id, team_id, project_id, user_id, task_hash, task_name, created_at, finished_at, minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    timer.id,
                    timer.team_id,
                    timer.project_id,
                    timer.user_id,
                    timer.task_hash,
                    timer.task_name,
                    encode_instant(&timer.created_at),
                    finished_at,
                    minutes,
                ],
            )
            .map_err(store_error)?;
        Ok(())
    }

    fn find_running(&self, team_id: &str, user_id: &str) -> Result<Option<Timer>, TimerError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM timers
                     WHERE team_id = ?1 AND user_id = ?2 AND finished_at IS NULL",
                    TIMER_COLUMNS
                ),
                params![team_id, user_id],
                read_row,
            )
            .optional()
            .map_err(store_error)?;

        row.map(TimerRow::into_timer).transpose()
    }

    fn find_by_id(&self, id: &str) -> Result<Timer, TimerError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM timers WHERE id = ?1", TIMER_COLUMNS),
                params![id],
                read_row,
            )
            .optional()
            .map_err(store_error)?;

        match row {
            Some(row) => row.into_timer(),
            None => Err(TimerError::NotFound(id.to_string())),
        }
    }

    fn list_by_user_and_range(
        &self,
        team_id: &str,
        user_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Timer>, TimerError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM timers
                 WHERE team_id = ?1 AND user_id = ?2 AND finished_at IS NOT NULL
                   AND created_at >= ?3 AND created_at < ?4
                 ORDER BY created_at ASC",
                TIMER_COLUMNS
            ))
            .map_err(store_error)?;

        let rows = stmt
            .query_map(
                params![
                    team_id,
                    user_id,
                    encode_instant(start),
                    encode_instant(end)
                ],
                read_row,
            )
            .map_err(store_error)?
            .collect::<Result<Vec<TimerRow>, _>>()
            .map_err(store_error)?;

        rows.into_iter().map(TimerRow::into_timer).collect()
    }

    fn update(&self, timer: &Timer) -> Result<(), TimerError> {
        let (finished_at, minutes) = finish_columns(timer);
        let changed = self
            .conn
            .execute(
                "UPDATE timers SET finished_at = ?2, minutes = ?3 WHERE id = ?1",
                params![timer.id, finished_at, minutes],
            )
            .map_err(store_error)?;

        if changed == 0 {
            return Err(TimerError::NotFound(timer.id.clone()));
        }
        Ok(())
    }
}

/// Raw column values of one timer row; instants still encoded as text.
struct TimerRow {
    id: String,
    team_id: String,
    project_id: String,
    user_id: String,
    task_hash: String,
    task_name: String,
    created_at: String,
    finished_at: Option<String>,
    minutes: Option<i64>,
}

impl TimerRow {
    fn into_timer(self) -> Result<Timer, TimerError> {
        let created_at = decode_instant(&self.created_at)?;
        let state = match (self.finished_at, self.minutes) {
            (None, None) => TimerState::Running,
            (Some(finished_at), Some(minutes)) => TimerState::Finished {
                finished_at: decode_instant(&finished_at)?,
                minutes,
            },
            _ => {
                return Err(TimerError::StoreUnavailable(format!(
                    "inconsistent finish state for timer {}",
                    self.id
                )))
            }
        };

        Ok(Timer {
            id: self.id,
            team_id: self.team_id,
            project_id: self.project_id,
            user_id: self.user_id,
            task_hash: self.task_hash,
            task_name: self.task_name,
            created_at,
            state,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<TimerRow> {
    Ok(TimerRow {
        id: row.get(0)?,
        team_id: row.get(1)?,
        project_id: row.get(2)?,
        user_id: row.get(3)?,
        task_hash: row.get(4)?,
        task_name: row.get(5)?,
        created_at: row.get(6)?,
        finished_at: row.get(7)?,
        minutes: row.get(8)?,
    })
}

fn finish_columns(timer: &Timer) -> (Option<String>, Option<i64>) {
    match &timer.state {
        TimerState::Running => (None, None),
        TimerState::Finished {
            finished_at,
            minutes,
        } => (Some(encode_instant(finished_at)), Some(*minutes)),
    }
}

// Fixed-width RFC 3339 UTC so lexicographic comparison in the range
// predicate is chronological.
fn encode_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_instant(text: &str) -> Result<DateTime<Utc>, TimerError> {
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.to_utc())
        .map_err(|err| TimerError::StoreUnavailable(format!("corrupt timestamp {}: {}", text, err)))
}

fn store_error(err: rusqlite::Error) -> TimerError {
    match err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            TimerError::Conflict
        }
        other => TimerError::StoreUnavailable(other.to_string()),
    }
}
