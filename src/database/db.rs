//! SQLite card store
//!
//! Keeps one row of SM-2 scheduling data per card together with a version
//! counter. Writes are a single conditional UPDATE, so the five scheduling
//! fields are replaced together or not at all.

use super::store::{CardStore, Result, StoreError};
use crate::config::StoreConfig;
use crate::models::{CardId, CardSchedulingState, DEFAULT_EASE_FACTOR, Versioned};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::sync::Mutex;

/// Card store backed by one SQLite connection.
///
/// Statements for all cards go through the same connection, so reviews of
/// different cards queue behind each other here. SQLite admits a single writer
/// per database file anyway; the contention belongs to the backend.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file named in `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(&config.db_path)?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        tracing::info!(path = %config.db_path.display(), "opened card store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
        f(&conn)
    }
}

/// Creates the scheduling table
///
/// Each timestamp is split into Unix seconds and a nanosecond remainder so the
/// stored value is exactly the one written. NULL seconds mean the card was never reviewed.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS card_schedule (
            card_id INTEGER PRIMARY KEY AUTOINCREMENT,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            repetitions INTEGER NOT NULL DEFAULT 0,
            interval_days INTEGER NOT NULL DEFAULT 0,
            due_date INTEGER,
            due_date_nanos INTEGER,
            last_reviewed INTEGER,
            last_reviewed_nanos INTEGER,
            version INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_card_schedule_due
         ON card_schedule(due_date, due_date_nanos)",
        (),
    )?;

    Ok(())
}

// Lock contention that outlived busy_timeout is a transient store failure.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                tracing::warn!(error = %e, "card store busy");
                StoreError::Unavailable(msg.unwrap_or_else(|| e.to_string()))
            }
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

fn split_timestamp(ts: Option<DateTime<Utc>>) -> (Option<i64>, Option<u32>) {
    match ts {
        Some(t) => (Some(t.timestamp()), Some(t.timestamp_subsec_nanos())),
        None => (None, None),
    }
}

fn join_timestamp(secs: Option<i64>, nanos: Option<u32>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, nanos.unwrap_or(0)))
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<CardSchedulingState> {
    Ok(CardSchedulingState {
        ease_factor: row.get("ease_factor")?,
        repetitions: row.get("repetitions")?,
        interval_days: row.get("interval_days")?,
        due_date: join_timestamp(row.get("due_date")?, row.get("due_date_nanos")?),
        last_reviewed: join_timestamp(row.get("last_reviewed")?, row.get("last_reviewed_nanos")?),
    })
}

impl CardStore for SqliteStore {
    fn create_card(&self) -> Result<CardId> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO card_schedule (ease_factor, repetitions, interval_days, version)
                 VALUES (?1, 0, 0, 0)",
                params![DEFAULT_EASE_FACTOR],
            )?;
            let card_id = conn.last_insert_rowid();
            tracing::info!(card_id, "card created");
            Ok(card_id)
        })
    }

    fn get_scheduling_state(&self, card_id: CardId) -> Result<Versioned<CardSchedulingState>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT ease_factor, repetitions, interval_days, due_date, due_date_nanos,
                        last_reviewed, last_reviewed_nanos, version
                 FROM card_schedule WHERE card_id = ?1",
                params![card_id],
                |row| {
                    Ok(Versioned {
                        value: state_from_row(row)?,
                        version: row.get::<_, i64>("version")? as u64,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound(card_id))
        })
    }

    fn put_scheduling_state(
        &self,
        card_id: CardId,
        state: &CardSchedulingState,
        expected_version: u64,
    ) -> Result<u64> {
        let (due_secs, due_nanos) = split_timestamp(state.due_date);
        let (reviewed_secs, reviewed_nanos) = split_timestamp(state.last_reviewed);

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE card_schedule
                 SET ease_factor = ?1, repetitions = ?2, interval_days = ?3,
                     due_date = ?4, due_date_nanos = ?5,
                     last_reviewed = ?6, last_reviewed_nanos = ?7,
                     version = version + 1
                 WHERE card_id = ?8 AND version = ?9",
                params![
                    state.ease_factor,
                    state.repetitions,
                    state.interval_days,
                    due_secs,
                    due_nanos,
                    reviewed_secs,
                    reviewed_nanos,
                    card_id,
                    expected_version as i64,
                ],
            )?;

            if updated == 1 {
                return Ok(expected_version + 1);
            }

            let exists = conn
                .query_row(
                    "SELECT 1 FROM card_schedule WHERE card_id = ?1",
                    params![card_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            if exists {
                Err(StoreError::Conflict {
                    card_id,
                    expected: expected_version,
                })
            } else {
                Err(StoreError::NotFound(card_id))
            }
        })
    }

    fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<(CardId, CardSchedulingState)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT card_id, ease_factor, repetitions, interval_days, due_date, due_date_nanos,
                        last_reviewed, last_reviewed_nanos
                 FROM card_schedule
                 WHERE due_date IS NULL
                    OR due_date < ?1
                    OR (due_date = ?1 AND due_date_nanos <= ?2)
                 ORDER BY due_date ASC NULLS FIRST, due_date_nanos ASC, card_id ASC",
            )?;

            let cards = stmt
                .query_map(params![now.timestamp(), now.timestamp_subsec_nanos()], |row| {
                    Ok((row.get("card_id")?, state_from_row(row)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(cards)
        })
    }
}
