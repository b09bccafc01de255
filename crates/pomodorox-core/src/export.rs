//! Export of persisted sessions, cycles, statistics and settings.
//!
//! Reads only through [`Store`]; nothing here feeds back into the timer.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Months, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ExportError, ValidationError};
use crate::settings::Settings;
use crate::stats::{annotate_streaks, DailyStats};
use crate::storage::Store;
use crate::timer::{Cycle, Session};

/// Version string written into export metadata.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const SESSION_BYTES: u64 = 150;
const CYCLE_BYTES: u64 = 250;
const STATS_BYTES: u64 = 150;
const SETTINGS_BYTES: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Which records to export, by start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    /// Every session and cycle; statistics for the past year.
    #[default]
    All,
    /// The 7 days before today, plus today.
    Week,
    /// One calendar month back from today, plus today.
    Month,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateRange {
    pub fn describe(&self) -> String {
        match self {
            DateRange::All => "All time".into(),
            DateRange::Week => "Last 7 days".into(),
            DateRange::Month => "Last month".into(),
            DateRange::Custom { start, end } => format!(
                "{} to {}",
                start.map(|d| d.to_string()).unwrap_or_default(),
                end.map(|d| d.to_string()).unwrap_or_default()
            ),
        }
    }

    /// Inclusive date bounds relative to `today`.
    ///
    /// # Errors
    /// Returns an error for a custom range that is missing a bound or
    /// ends before it starts.
    pub fn bounds(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), CoreError> {
        match *self {
            DateRange::All => Ok((year_before(today), today)),
            DateRange::Week => Ok((today - Duration::days(7), today)),
            DateRange::Month => Ok((
                today.checked_sub_months(Months::new(1)).unwrap_or(today),
                today,
            )),
            DateRange::Custom { start, end } => {
                let (Some(start), Some(end)) = (start, end) else {
                    return Err(ExportError::MissingCustomRange.into());
                };
                if end < start {
                    return Err(ValidationError::InvalidDateRange { start, end }.into());
                }
                Ok((start, end))
            }
        }
    }
}

fn year_before(today: NaiveDate) -> NaiveDate {
    today.checked_sub_months(Months::new(12)).unwrap_or(today)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub range: DateRange,
    pub include_settings: bool,
    pub include_sessions: bool,
    pub include_cycles: bool,
    pub include_stats: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            range: DateRange::All,
            include_settings: true,
            include_sessions: true,
            include_cycles: true,
            include_stats: true,
        }
    }
}

impl ExportOptions {
    fn nothing_selected(&self) -> bool {
        !(self.include_settings || self.include_sessions || self.include_cycles || self.include_stats)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_date: DateTime<Utc>,
    pub date_range: String,
    pub app_version: String,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    pub metadata: ExportMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<Vec<Cycle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_stats: Option<Vec<DailyStats>>,
}

/// Record counts and a rough size estimate for an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPreview {
    pub sessions: usize,
    pub cycles: usize,
    pub daily_stats: usize,
    pub date_range: String,
    pub estimated_bytes: u64,
}

impl ExportPreview {
    /// `B`, `KB` or `MB`, rounded.
    pub fn estimated_size(&self) -> String {
        let bytes = self.estimated_bytes;
        if bytes < 1024 {
            format!("{bytes} B")
        } else if bytes < 1024 * 1024 {
            format!("{} KB", (bytes as f64 / 1024.0).round())
        } else {
            format!("{} MB", (bytes as f64 / (1024.0 * 1024.0)).round())
        }
    }
}

/// Collect the selected records.
///
/// # Errors
/// Returns an error for an empty selection, an invalid range, or a failed
/// storage read.
pub fn prepare<S: Store + ?Sized>(
    store: &S,
    options: &ExportOptions,
    now: DateTime<Utc>,
) -> Result<ExportData, CoreError> {
    if options.nothing_selected() {
        return Err(ExportError::EmptySelection.into());
    }
    let (start, end) = options.range.bounds(now.date_naive())?;
    let all = options.range == DateRange::All;

    let settings = if options.include_settings {
        Some(store.get_settings()?)
    } else {
        None
    };
    let sessions = if !options.include_sessions {
        None
    } else if all {
        Some(store.get_sessions()?)
    } else {
        Some(store.get_sessions_for_range(start, end)?)
    };
    let cycles = if !options.include_cycles {
        None
    } else if all {
        Some(store.get_cycles()?)
    } else {
        Some(store.get_cycles_for_range(start, end)?)
    };
    let daily_stats = if options.include_stats {
        let mut days = store.get_stats_for_range(start, end)?;
        let goal = store.get_settings()?.goals.daily_cycles;
        annotate_streaks(&mut days, goal);
        Some(days)
    } else {
        None
    };

    let total_records = sessions.as_ref().map_or(0, Vec::len)
        + cycles.as_ref().map_or(0, Vec::len)
        + daily_stats.as_ref().map_or(0, Vec::len)
        + usize::from(settings.is_some());

    Ok(ExportData {
        metadata: ExportMetadata {
            export_date: now,
            date_range: options.range.describe(),
            app_version: APP_VERSION.to_string(),
            total_records,
        },
        settings,
        sessions,
        cycles,
        daily_stats,
    })
}

/// Count what [`prepare`] would export without serializing it.
///
/// # Errors
/// Same as [`prepare`].
pub fn preview<S: Store + ?Sized>(
    store: &S,
    options: &ExportOptions,
    now: DateTime<Utc>,
) -> Result<ExportPreview, CoreError> {
    let data = prepare(store, options, now)?;
    let sessions = data.sessions.as_ref().map_or(0, Vec::len);
    let cycles = data.cycles.as_ref().map_or(0, Vec::len);
    let daily_stats = data.daily_stats.as_ref().map_or(0, Vec::len);
    let settings = if data.settings.is_some() { SETTINGS_BYTES } else { 0 };
    Ok(ExportPreview {
        sessions,
        cycles,
        daily_stats,
        date_range: data.metadata.date_range,
        estimated_bytes: sessions as u64 * SESSION_BYTES
            + cycles as u64 * CYCLE_BYTES
            + daily_stats as u64 * STATS_BYTES
            + settings,
    })
}

/// Pretty-printed JSON document.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_json(data: &ExportData) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Sectioned CSV: settings, daily statistics, cycles, sessions.
pub fn to_csv(data: &ExportData) -> String {
    let mut out = String::new();

    if let Some(settings) = &data.settings {
        out.push_str("=== SETTINGS ===\n");
        out.push_str("Setting,Value\n");
        let rows = [
            ("Work Duration", settings.work_min.to_string()),
            ("Short Break Duration", settings.short_break_min.to_string()),
            ("Long Break Duration", settings.long_break_min.to_string()),
            ("Cycle Length", settings.cycle_length.to_string()),
            ("Sound Enabled", settings.sound_enabled.to_string()),
            ("Volume", settings.volume.to_string()),
            ("Auto Start Breaks", settings.auto_start_breaks.to_string()),
            ("Auto Start Work Sessions", settings.auto_start_work.to_string()),
            ("Daily Goal", settings.goals.daily_cycles.to_string()),
            ("Weekly Goal", settings.goals.weekly_cycles.to_string()),
        ];
        for (name, value) in rows {
            out.push_str(&format!("{name},{}\n", csv_escape(&value)));
        }
        out.push('\n');
    }

    if let Some(days) = &data.daily_stats {
        out.push_str("=== DAILY STATISTICS ===\n");
        out.push_str("Date,Completed Cycles,Focus Time (min),Break Time (min),Streak,Categories\n");
        for day in days {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                day.date,
                day.completed_cycles,
                day.total_focus_min,
                day.total_break_min,
                day.streak,
                csv_escape(&day.categories_summary()),
            ));
        }
        out.push('\n');
    }

    if let Some(cycles) = &data.cycles {
        out.push_str("=== CYCLES ===\n");
        out.push_str("ID,Label,Category,Start Time,End Time,Completed,Sessions Count\n");
        for cycle in cycles {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                cycle.id,
                csv_escape(cycle.label.as_deref().unwrap_or("")),
                csv_escape(cycle.category.as_deref().unwrap_or("")),
                iso(&cycle.started_at),
                cycle.ended_at.as_ref().map(iso).unwrap_or_default(),
                cycle.completed,
                cycle.sessions.len(),
            ));
        }
        out.push('\n');
    }

    if let Some(sessions) = &data.sessions {
        out.push_str("=== SESSIONS ===\n");
        out.push_str("ID,Cycle ID,Type,Duration (min),Start Time,End Time,Completed\n");
        for session in sessions {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                session.id,
                session.cycle_id,
                session.kind,
                session.duration_min,
                iso(&session.started_at),
                session.ended_at.as_ref().map(iso).unwrap_or_default(),
                session.completed,
            ));
        }
    }

    out
}

/// `pomodoro-data-YYYY-MM-DD.{json,csv}`.
pub fn file_name(format: ExportFormat, today: NaiveDate) -> String {
    format!("pomodoro-data-{}.{}", today.format("%Y-%m-%d"), format.extension())
}

/// Serialize `data` in `format` into `dir`, returning the written path.
///
/// # Errors
/// Returns an error if serialization or the file write fails.
pub fn write_export(
    data: &ExportData,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, CoreError> {
    let content = match format {
        ExportFormat::Json => to_json(data)?,
        ExportFormat::Csv => to_csv(data),
    };
    let path = dir.join(file_name(format, data.metadata.export_date.date_naive()));
    std::fs::write(&path, content).map_err(|source| ExportError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), records = data.metadata.total_records, "export written");
    Ok(path)
}

fn iso(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn custom_range_requires_both_bounds() {
        let range = DateRange::Custom {
            start: Some(date(2026, 1, 1)),
            end: None,
        };
        assert!(matches!(
            range.bounds(date(2026, 2, 1)),
            Err(CoreError::Export(ExportError::MissingCustomRange))
        ));
    }

    #[test]
    fn custom_range_rejects_reversed_bounds() {
        let range = DateRange::Custom {
            start: Some(date(2026, 2, 1)),
            end: Some(date(2026, 1, 1)),
        };
        assert!(matches!(
            range.bounds(date(2026, 3, 1)),
            Err(CoreError::Validation(ValidationError::InvalidDateRange { .. }))
        ));
    }

    #[test]
    fn relative_ranges_end_today() {
        let today = date(2026, 3, 31);
        assert_eq!(DateRange::Week.bounds(today).unwrap(), (date(2026, 3, 24), today));
        assert_eq!(DateRange::Month.bounds(today).unwrap(), (date(2026, 2, 28), today));
        assert_eq!(DateRange::All.bounds(today).unwrap(), (date(2025, 3, 31), today));
    }

    #[test]
    fn file_name_uses_export_day() {
        assert_eq!(
            file_name(ExportFormat::Csv, date(2026, 7, 4)),
            "pomodoro-data-2026-07-04.csv"
        );
    }

    #[test]
    fn csv_escape_quotes_only_when_needed() {
        assert_eq!(csv_escape("Deep Work"), "Deep Work");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn preview_size_units() {
        let mut preview = ExportPreview {
            sessions: 0,
            cycles: 0,
            daily_stats: 0,
            date_range: String::new(),
            estimated_bytes: 500,
        };
        assert_eq!(preview.estimated_size(), "500 B");
        preview.estimated_bytes = 3 * 1024;
        assert_eq!(preview.estimated_size(), "3 KB");
        preview.estimated_bytes = 5 * 1024 * 1024;
        assert_eq!(preview.estimated_size(), "5 MB");
    }
}
