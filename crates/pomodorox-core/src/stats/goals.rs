use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::daily::DailyStats;
use crate::settings::Goals;

/// Progress towards each goal, as raw values and 0..=100 percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub daily_cycles: u32,
    pub daily_cycles_pct: f64,
    pub daily_focus_min: u32,
    pub daily_focus_pct: f64,
    pub weekly_cycles: u32,
    pub weekly_cycles_pct: f64,
    pub streak_days: u32,
    pub streak_pct: f64,
}

impl GoalProgress {
    pub fn compute(goals: &Goals, today: &DailyStats, week: &[DailyStats], streak: u32) -> Self {
        let weekly_cycles = week.iter().map(|d| d.completed_cycles).sum();
        Self {
            daily_cycles: today.completed_cycles,
            daily_cycles_pct: percent(today.completed_cycles, goals.daily_cycles),
            daily_focus_min: today.total_focus_min,
            daily_focus_pct: percent(today.total_focus_min, goals.daily_focus_min),
            weekly_cycles,
            weekly_cycles_pct: percent(weekly_cycles, goals.weekly_cycles),
            streak_days: streak,
            streak_pct: percent(streak, goals.streak_target),
        }
    }

    pub fn daily_goal_met(&self) -> bool {
        self.daily_cycles_pct >= 100.0
    }
}

fn percent(value: u32, target: u32) -> f64 {
    if target == 0 {
        return 100.0;
    }
    (f64::from(value) / f64::from(target) * 100.0).min(100.0)
}

/// Sunday..=Saturday week containing `today`.
pub fn week_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    (start, start + Duration::days(6))
}

/// First..=last day of the month containing `today`.
pub fn month_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap_or(today);
    let next_month = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    let end = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(today);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn progress_is_capped_at_100() {
        let goals = Goals::default();
        let mut today = DailyStats::empty(date(2026, 5, 6));
        today.completed_cycles = 12;
        today.total_focus_min = 100;
        let progress = GoalProgress::compute(&goals, &today, &[today.clone()], 3);
        assert_eq!(progress.daily_cycles_pct, 100.0);
        assert_eq!(progress.daily_focus_pct, 50.0);
        assert_eq!(progress.weekly_cycles, 12);
        assert_eq!(progress.weekly_cycles_pct, 30.0);
        assert!((progress.streak_pct - 300.0 / 7.0).abs() < 1e-9);
        assert!(progress.daily_goal_met());
    }

    #[test]
    fn zero_target_counts_as_met() {
        let goals = Goals {
            daily_cycles: 0,
            ..Default::default()
        };
        let today = DailyStats::empty(date(2026, 5, 6));
        assert_eq!(GoalProgress::compute(&goals, &today, &[], 0).daily_cycles_pct, 100.0);
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2026-05-06 is a Wednesday.
        assert_eq!(week_range(date(2026, 5, 6)), (date(2026, 5, 3), date(2026, 5, 9)));
        assert_eq!(week_range(date(2026, 5, 3)), (date(2026, 5, 3), date(2026, 5, 9)));
    }

    #[test]
    fn month_range_handles_december_and_february() {
        assert_eq!(month_range(date(2026, 12, 15)), (date(2026, 12, 1), date(2026, 12, 31)));
        assert_eq!(month_range(date(2028, 2, 10)), (date(2028, 2, 1), date(2028, 2, 29)));
    }
}
