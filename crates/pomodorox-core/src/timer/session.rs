use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        matches!(self, SessionType::ShortBreak | SessionType::LongBreak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Work => "Focus Time",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(SessionType::Work),
            "short_break" | "short-break" | "shortBreak" => Ok(SessionType::ShortBreak),
            "long_break" | "long-break" | "longBreak" => Ok(SessionType::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One work or break interval.
///
/// `completed` is true only when the countdown reached zero; skipped
/// sessions are finalized with `completed = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub kind: SessionType,
    /// Planned duration in minutes.
    pub duration_min: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl Session {
    pub fn new(
        id: Uuid,
        cycle_id: Uuid,
        kind: SessionType,
        duration_min: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            cycle_id,
            kind,
            duration_min,
            started_at,
            ended_at: None,
            completed: false,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_min).saturating_mul(60)
    }

    /// Copy of this session with its end time and outcome set.
    pub fn finalized(&self, at: DateTime<Utc>, completed: bool) -> Session {
        Session {
            ended_at: Some(at),
            completed,
            ..self.clone()
        }
    }
}

/// One rotation of work sessions interleaved with breaks, capped by a long
/// break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Set at long-break finalization when the cycle qualifies.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl Cycle {
    /// A fresh cycle. Empty label/category strings are stored as `None`.
    pub fn new(id: Uuid, label: &str, category: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            label: non_empty(label),
            category: non_empty(category),
            started_at,
            ended_at: None,
            completed: false,
            sessions: Vec::new(),
        }
    }

    /// Work sessions recorded so far, finished or skipped.
    pub fn work_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.kind == SessionType::Work)
            .count()
    }

    /// Work sessions that ran to zero.
    pub fn completed_work_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.kind == SessionType::Work && s.completed)
            .count()
    }

    /// Whether enough work sessions ran to zero for the cycle to count.
    pub fn qualifies(&self, cycle_length: u32) -> bool {
        self.completed_work_sessions() >= required_completed_sessions(cycle_length)
    }

    pub fn focus_minutes(&self) -> u32 {
        self.sessions
            .iter()
            .filter(|s| s.kind == SessionType::Work && s.completed)
            .map(|s| s.duration_min)
            .sum()
    }

    pub(crate) fn set_label(&mut self, label: &str, category: &str) {
        self.label = non_empty(label);
        self.category = non_empty(category);
    }
}

/// Completed work sessions a cycle needs: half the cycle length, rounded up.
pub fn required_completed_sessions(cycle_length: u32) -> usize {
    cycle_length.max(1).div_ceil(2) as usize
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
