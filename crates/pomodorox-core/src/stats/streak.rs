use chrono::{Duration, NaiveDate};

use super::daily::DailyStats;
use crate::error::DatabaseError;
use crate::storage::Store;

/// How far back [`current_streak`] looks.
pub const STREAK_LOOKBACK_DAYS: i64 = 365;

/// Consecutive days ending at `today` whose completed cycles meet
/// `daily_goal`. A day without recorded data ends the streak.
///
/// # Errors
/// Returns an error if reading a day's aggregate fails.
pub fn current_streak<S: Store + ?Sized>(
    store: &S,
    daily_goal: u32,
    today: NaiveDate,
) -> Result<u32, DatabaseError> {
    let mut streak = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        let date = today - Duration::days(offset);
        match store.get_daily_stats(date)? {
            Some(day) if day.completed_cycles >= daily_goal => streak += 1,
            _ => break,
        }
    }
    Ok(streak)
}

/// Fill `streak` on each entry of a date-ordered, gap-free run of days.
pub fn annotate_streaks(days: &mut [DailyStats], daily_goal: u32) {
    let mut running = 0;
    for day in days.iter_mut() {
        if day.completed_cycles >= daily_goal {
            running += 1;
        } else {
            running = 0;
        }
        day.streak = running;
    }
}
