use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::daily::{DailyStats, StatsPatch};
use crate::error::DatabaseError;
use crate::storage::Store;
use crate::timer::SessionType;

/// What a finalized session contributes to statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub kind: SessionType,
    pub duration_min: u32,
    /// False when skipped.
    pub completed: bool,
    /// Present only when a long break closed its cycle.
    pub cycle: Option<CycleOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub qualified: bool,
    pub category: Option<String>,
    pub completed_work_sessions: u32,
}

/// Patch to apply to `current` for one finalized session, or `None` when
/// the session does not count (a skipped work session).
pub fn accrual_patch(current: &DailyStats, outcome: &SessionOutcome) -> Option<StatsPatch> {
    match outcome.kind {
        SessionType::Work => {
            if !outcome.completed {
                return None;
            }
            Some(StatsPatch {
                total_focus_min: Some(current.total_focus_min.saturating_add(outcome.duration_min)),
                ..Default::default()
            })
        }
        SessionType::ShortBreak => Some(StatsPatch {
            total_break_min: Some(current.total_break_min.saturating_add(outcome.duration_min)),
            ..Default::default()
        }),
        SessionType::LongBreak => {
            let mut patch = StatsPatch {
                total_break_min: Some(current.total_break_min.saturating_add(outcome.duration_min)),
                ..Default::default()
            };
            if let Some(cycle) = outcome.cycle.as_ref().filter(|c| c.qualified) {
                patch.completed_cycles = Some(current.completed_cycles.saturating_add(1));
                if let Some(ref category) = cycle.category {
                    let mut categories = current.categories.clone();
                    let count = categories.entry(category.clone()).or_insert(0);
                    *count = count.saturating_add(1);
                    patch.categories = Some(categories);
                }
            }
            Some(patch)
        }
    }
}

/// Fold one finalized session into the aggregate for `date`.
///
/// Returns the updated aggregate, or `None` if nothing was written.
///
/// # Errors
/// Returns an error if reading or writing the aggregate fails.
pub fn accrue<S: Store + ?Sized>(
    store: &S,
    date: NaiveDate,
    outcome: &SessionOutcome,
) -> Result<Option<DailyStats>, DatabaseError> {
    let current = store.today_stats(date)?;
    match accrual_patch(&current, outcome) {
        Some(patch) => store.update_daily_stats(date, &patch).map(Some),
        None => Ok(None),
    }
}
