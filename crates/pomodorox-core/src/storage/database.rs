//! SQLite-backed implementation of [`Store`].
//!
//! Provides persistent storage for:
//! - Finalized sessions and cycles
//! - Per-day statistics aggregates
//! - Key-value store for settings

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{data_dir, migrations, Store};
use crate::error::DatabaseError;
use crate::settings::Settings;
use crate::stats::{DailyStats, StatsPatch};
use crate::timer::{Cycle, Session, SessionType};

const SETTINGS_KEY: &str = "settings";
const SESSION_COLUMNS: &str = "id, cycle_id, kind, duration_min, started_at, ended_at, completed";
const CYCLE_COLUMNS: &str = "id, label, category, started_at, ended_at, completed, sessions";

/// SQLite database for sessions, cycles, daily stats and settings.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomodorox/pomodorox.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()?.join("pomodorox.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn query_sessions(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Session>, DatabaseError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions {filter} ORDER BY started_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, session_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(decode_session(row?)?);
        }
        Ok(sessions)
    }

    fn query_cycles(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Cycle>, DatabaseError> {
        let sql = format!("SELECT {CYCLE_COLUMNS} FROM cycles {filter} ORDER BY started_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, cycle_row)?;
        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(decode_cycle(row?)?);
        }
        Ok(cycles)
    }

    fn write_daily_stats(&self, stats: &DailyStats) -> Result<(), DatabaseError> {
        let categories = serde_json::to_string(&stats.categories).map_err(|e| {
            DatabaseError::Corrupt {
                table: "daily_stats",
                message: e.to_string(),
            }
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO daily_stats
                (date, completed_cycles, total_focus_min, total_break_min, categories)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stats.date.to_string(),
                stats.completed_cycles,
                stats.total_focus_min,
                stats.total_break_min,
                categories,
            ],
        )?;
        Ok(())
    }
}

impl Store for Database {
    fn get_settings(&self) -> Result<Settings, DatabaseError> {
        let Some(content) = self.kv_get(SETTINGS_KEY)? else {
            return Ok(Settings::default());
        };
        match Settings::from_toml(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("stored settings are unreadable, using defaults: {e}");
                Ok(Settings::default())
            }
        }
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), DatabaseError> {
        let content = settings
            .to_toml()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.kv_set(SETTINGS_KEY, &content)
    }

    fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions
                (id, cycle_id, kind, duration_min, started_at, ended_at, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.to_string(),
                session.cycle_id.to_string(),
                session.kind.as_str(),
                session.duration_min,
                timestamp(&session.started_at),
                session.ended_at.as_ref().map(timestamp),
                session.completed,
            ],
        )?;
        Ok(())
    }

    fn get_sessions(&self) -> Result<Vec<Session>, DatabaseError> {
        self.query_sessions("", &[])
    }

    fn get_sessions_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, DatabaseError> {
        let (from, until) = range_bounds(start, end);
        self.query_sessions(
            "WHERE started_at >= ?1 AND started_at < ?2",
            &[&from, &until],
        )
    }

    fn save_cycle(&self, cycle: &Cycle) -> Result<(), DatabaseError> {
        let sessions = serde_json::to_string(&cycle.sessions).map_err(|e| {
            DatabaseError::Corrupt {
                table: "cycles",
                message: e.to_string(),
            }
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cycles
                (id, label, category, started_at, ended_at, completed, sessions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                cycle.id.to_string(),
                cycle.label,
                cycle.category,
                timestamp(&cycle.started_at),
                cycle.ended_at.as_ref().map(timestamp),
                cycle.completed,
                sessions,
            ],
        )?;
        Ok(())
    }

    fn get_cycles(&self) -> Result<Vec<Cycle>, DatabaseError> {
        self.query_cycles("", &[])
    }

    fn get_cycles_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Cycle>, DatabaseError> {
        let (from, until) = range_bounds(start, end);
        self.query_cycles(
            "WHERE started_at >= ?1 AND started_at < ?2",
            &[&from, &until],
        )
    }

    fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT completed_cycles, total_focus_min, total_break_min, categories
                 FROM daily_stats WHERE date = ?1",
                params![date.to_string()],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((completed_cycles, total_focus_min, total_break_min, categories)) = row else {
            return Ok(None);
        };
        let categories: BTreeMap<String, u32> =
            serde_json::from_str(&categories).map_err(|e| DatabaseError::Corrupt {
                table: "daily_stats",
                message: e.to_string(),
            })?;
        Ok(Some(DailyStats {
            date,
            completed_cycles,
            total_focus_min,
            total_break_min,
            streak: 0,
            categories,
        }))
    }

    fn update_daily_stats(
        &self,
        date: NaiveDate,
        patch: &StatsPatch,
    ) -> Result<DailyStats, DatabaseError> {
        let current = self.today_stats(date)?;
        let next = current.patched(patch);
        self.write_daily_stats(&next)?;
        Ok(next)
    }

    fn get_stats_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyStats>, DatabaseError> {
        let mut days = Vec::new();
        let mut date = start;
        while date <= end {
            days.push(self.today_stats(date)?);
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(days)
    }

    fn reset_daily_stats(&self, date: NaiveDate) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM daily_stats WHERE date = ?1",
            params![date.to_string()],
        )?;
        Ok(())
    }

    fn reset_all_statistics(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "DELETE FROM sessions;
             DELETE FROM cycles;
             DELETE FROM daily_stats;",
        )?;
        Ok(())
    }
}

/// Fixed-width UTC timestamps so that text comparison orders by time.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Half-open timestamp bounds covering `[start, end]` as whole days.
fn range_bounds(start: NaiveDate, end: NaiveDate) -> (String, String) {
    let from = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    let until = (end + Duration::days(1)).and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    (
        from.as_ref().map(timestamp).unwrap_or_default(),
        until.as_ref().map(timestamp).unwrap_or_default(),
    )
}

type SessionRow = (String, String, String, u32, String, Option<String>, bool);
type CycleRow = (
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    bool,
    String,
);

fn session_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn cycle_row(row: &Row<'_>) -> rusqlite::Result<CycleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn corrupt(table: &'static str) -> impl Fn(String) -> DatabaseError {
    move |message| DatabaseError::Corrupt { table, message }
}

fn parse_uuid(table: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| corrupt(table)(e.to_string()))
}

fn parse_time(table: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(table)(e.to_string()))
}

fn decode_session(row: SessionRow) -> Result<Session, DatabaseError> {
    let (id, cycle_id, kind, duration_min, started_at, ended_at, completed) = row;
    Ok(Session {
        id: parse_uuid("sessions", &id)?,
        cycle_id: parse_uuid("sessions", &cycle_id)?,
        kind: kind.parse::<SessionType>().map_err(corrupt("sessions"))?,
        duration_min,
        started_at: parse_time("sessions", &started_at)?,
        ended_at: ended_at
            .as_deref()
            .map(|t| parse_time("sessions", t))
            .transpose()?,
        completed,
    })
}

fn decode_cycle(row: CycleRow) -> Result<Cycle, DatabaseError> {
    let (id, label, category, started_at, ended_at, completed, sessions) = row;
    Ok(Cycle {
        id: parse_uuid("cycles", &id)?,
        label,
        category,
        started_at: parse_time("cycles", &started_at)?,
        ended_at: ended_at
            .as_deref()
            .map(|t| parse_time("cycles", t))
            .transpose()?,
        completed,
        sessions: serde_json::from_str(&sessions).map_err(|e| corrupt("cycles")(e.to_string()))?,
    })
}
