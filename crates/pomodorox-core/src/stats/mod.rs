//! Daily statistics for PomodoroX.
//!
//! Finalized sessions are folded into one aggregate per calendar day
//! ([`DailyStats`]). Streaks and goal progress are derived on demand from
//! those aggregates and never stored.

mod accrual;
mod daily;
mod goals;
mod streak;

pub use accrual::{accrual_patch, accrue, CycleOutcome, SessionOutcome};
pub use daily::{DailyStats, StatsPatch};
pub use goals::{month_range, week_range, GoalProgress};
pub use streak::{annotate_streaks, current_streak, STREAK_LOOKBACK_DAYS};
