//! Database schema migrations for pomodorox.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: sessions, cycles, daily aggregates and the key-value table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id           TEXT PRIMARY KEY,
            cycle_id     TEXT NOT NULL,
            kind         TEXT NOT NULL,
            duration_min INTEGER NOT NULL,
            started_at   TEXT NOT NULL,
            ended_at     TEXT,
            completed    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cycles (
            id         TEXT PRIMARY KEY,
            label      TEXT,
            category   TEXT,
            started_at TEXT NOT NULL,
            ended_at   TEXT,
            completed  INTEGER NOT NULL DEFAULT 0,
            sessions   TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            date             TEXT PRIMARY KEY,
            completed_cycles INTEGER NOT NULL DEFAULT 0,
            total_focus_min  INTEGER NOT NULL DEFAULT 0,
            total_break_min  INTEGER NOT NULL DEFAULT 0,
            categories       TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(conn, 1)
}

/// v2: indexes for date-range queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_cycle_id ON sessions(cycle_id);
        CREATE INDEX IF NOT EXISTS idx_cycles_started_at ON cycles(started_at);",
    )?;
    set_schema_version(conn, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn fresh_database_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 0);
    }
}
