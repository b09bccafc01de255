use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use pomodorox_core::category;
use pomodorox_core::stats::{annotate_streaks, month_range, week_range, GoalProgress};
use pomodorox_core::{DailyStats, Database, Store, ValidationError};
use serde::Serialize;

use super::parse_date;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today {
        #[arg(long)]
        json: bool,
    },
    /// This week (Sunday to Saturday)
    Week {
        #[arg(long)]
        json: bool,
    },
    /// This calendar month
    Month {
        #[arg(long)]
        json: bool,
    },
    /// An explicit date range, inclusive
    Range {
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Consecutive days meeting the daily cycle goal
    Streak,
    /// Progress towards daily, weekly and streak goals
    Goals {
        #[arg(long)]
        json: bool,
    },
    /// Reset today's statistics, or everything with --all
    Reset {
        /// Also delete all sessions, cycles and past days (settings are kept)
        #[arg(long)]
        all: bool,
    },
}

#[derive(Serialize)]
struct RangeSummary {
    start: NaiveDate,
    end: NaiveDate,
    completed_cycles: u32,
    total_focus_min: u32,
    total_break_min: u32,
    days: Vec<DailyStats>,
}

impl RangeSummary {
    fn new(start: NaiveDate, end: NaiveDate, days: Vec<DailyStats>) -> Self {
        Self {
            start,
            end,
            completed_cycles: days.iter().map(|d| d.completed_cycles).sum(),
            total_focus_min: days.iter().map(|d| d.total_focus_min).sum(),
            total_break_min: days.iter().map(|d| d.total_break_min).sum(),
            days,
        }
    }
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = Utc::now().date_naive();

    match action {
        StatsAction::Today { json } => {
            let mut stats = db.today_stats(today)?;
            stats.streak = db.current_streak(today)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_day(&stats);
            }
        }
        StatsAction::Week { json } => {
            let (start, end) = week_range(today);
            print_range(&db, start, end, json)?;
        }
        StatsAction::Month { json } => {
            let (start, end) = month_range(today);
            print_range(&db, start, end, json)?;
        }
        StatsAction::Range { from, to, json } => {
            if to < from {
                return Err(ValidationError::InvalidDateRange {
                    start: from,
                    end: to,
                }
                .into());
            }
            print_range(&db, from, to, json)?;
        }
        StatsAction::Streak => {
            println!("{}", db.current_streak(today)?);
        }
        StatsAction::Goals { json } => {
            let goals = db.get_settings()?.goals;
            let (start, end) = week_range(today);
            let week = db.get_stats_for_range(start, end)?;
            let progress = GoalProgress::compute(
                &goals,
                &db.today_stats(today)?,
                &week,
                db.current_streak(today)?,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                println!(
                    "Daily cycles:  {}/{} ({:.0}%)",
                    progress.daily_cycles, goals.daily_cycles, progress.daily_cycles_pct
                );
                println!(
                    "Daily focus:   {}/{} min ({:.0}%)",
                    progress.daily_focus_min, goals.daily_focus_min, progress.daily_focus_pct
                );
                println!(
                    "Weekly cycles: {}/{} ({:.0}%)",
                    progress.weekly_cycles, goals.weekly_cycles, progress.weekly_cycles_pct
                );
                println!(
                    "Streak:        {}/{} days ({:.0}%)",
                    progress.streak_days, goals.streak_target, progress.streak_pct
                );
            }
        }
        StatsAction::Reset { all } => {
            if all {
                db.reset_all_statistics()?;
                println!("all statistics reset");
            } else {
                db.reset_daily_stats(today)?;
                println!("today's statistics reset");
            }
        }
    }
    Ok(())
}

fn print_range(
    db: &Database,
    start: NaiveDate,
    end: NaiveDate,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut days = db.get_stats_for_range(start, end)?;
    annotate_streaks(&mut days, db.get_settings()?.goals.daily_cycles);
    let summary = RangeSummary::new(start, end, days);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "{} .. {}: {} cycles, {} min focus, {} min break",
        summary.start,
        summary.end,
        summary.completed_cycles,
        summary.total_focus_min,
        summary.total_break_min
    );
    for day in &summary.days {
        print_day(day);
    }
    Ok(())
}

fn print_day(day: &DailyStats) {
    let categories: Vec<String> = day
        .categories
        .iter()
        .map(|(id, count)| format!("{} {count}", category::display_name(id)))
        .collect();
    println!(
        "{}  cycles {:>2}  focus {:>4} min  break {:>4} min  streak {:>3}  {}",
        day.date,
        day.completed_cycles,
        day.total_focus_min,
        day.total_break_min,
        day.streak,
        categories.join(", ")
    );
}
