pub mod database;
pub mod migrations;

pub use database::Database;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::settings::Settings;
use crate::stats::{self, DailyStats, StatsPatch};
use crate::timer::{Cycle, Session};

/// Persistence collaborator for the timer.
///
/// Range queries take inclusive UTC calendar dates and match records by
/// their start timestamp. Implementations are local and synchronous; the
/// driver calls them inline and logs failures instead of propagating them.
pub trait Store {
    /// Stored settings merged with defaults, or defaults when none are stored.
    fn get_settings(&self) -> Result<Settings, DatabaseError>;
    fn save_settings(&self, settings: &Settings) -> Result<(), DatabaseError>;

    fn save_session(&self, session: &Session) -> Result<(), DatabaseError>;
    fn get_sessions(&self) -> Result<Vec<Session>, DatabaseError>;
    fn get_sessions_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, DatabaseError>;

    fn save_cycle(&self, cycle: &Cycle) -> Result<(), DatabaseError>;
    fn get_cycles(&self) -> Result<Vec<Cycle>, DatabaseError>;
    fn get_cycles_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Cycle>, DatabaseError>;

    /// Aggregate for `date`, or `None` if nothing was recorded that day.
    fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>, DatabaseError>;
    /// Merge `patch` into the aggregate for `date`, creating it if needed.
    fn update_daily_stats(
        &self,
        date: NaiveDate,
        patch: &StatsPatch,
    ) -> Result<DailyStats, DatabaseError>;
    /// Every day in `[start, end]`, empty aggregates for days without data.
    fn get_stats_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyStats>, DatabaseError>;

    fn reset_daily_stats(&self, date: NaiveDate) -> Result<(), DatabaseError>;
    /// Drop sessions, cycles and daily aggregates. Settings are kept.
    fn reset_all_statistics(&self) -> Result<(), DatabaseError>;

    fn today_stats(&self, today: NaiveDate) -> Result<DailyStats, DatabaseError> {
        Ok(self
            .get_daily_stats(today)?
            .unwrap_or_else(|| DailyStats::empty(today)))
    }

    fn current_streak(&self, today: NaiveDate) -> Result<u32, DatabaseError> {
        let goal = self.get_settings()?.goals.daily_cycles;
        stats::current_streak(self, goal, today)
    }
}

/// Returns `~/.config/pomodorox[-dev]/` based on POMODOROX_ENV.
///
/// Set POMODOROX_ENV=dev to use development data directory.
/// POMODOROX_DATA_DIR overrides both.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, DatabaseError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMODOROX_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if let Some(dir) = std::env::var_os("POMODOROX_DATA_DIR") {
        PathBuf::from(dir)
    } else if env == "dev" {
        base_dir.join("pomodorox-dev")
    } else {
        base_dir.join("pomodorox")
    };

    std::fs::create_dir_all(&dir).map_err(|source| DatabaseError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
