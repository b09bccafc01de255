use serde::{Deserialize, Serialize};

use super::session::{Cycle, Session, SessionType};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    /// Countdown hit zero; waiting for the session to be finalized.
    Completed,
}

/// Immutable snapshot of the timer.
///
/// Owned by the driver; the transition function takes it by value and
/// returns the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimerState {
    pub current_session: Option<Session>,
    pub current_cycle: Option<Cycle>,
    /// Seconds left in the current session.
    pub remaining_secs: u64,
    pub phase: TimerPhase,
    /// Qualified cycles counted today.
    pub completed_cycles: u32,
    pub settings: Settings,
    /// Suggested type for the next session, set after a skip or completion.
    pub next_session_type: Option<SessionType>,
    /// Applied to each newly created cycle.
    pub default_label: String,
    pub default_category: String,
}

impl TimerState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Total seconds of the current session, or zero without one.
    pub fn total_secs(&self) -> u64 {
        self.current_session
            .as_ref()
            .map(Session::duration_secs)
            .unwrap_or(0)
    }

    /// 0.0 ..= 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs.min(total) as f64 / total as f64)
    }

    /// Pending type that should start on its own, if any.
    pub fn auto_start_candidate(&self) -> Option<SessionType> {
        if self.phase != TimerPhase::Idle {
            return None;
        }
        self.next_session_type
            .filter(|kind| self.settings.auto_starts(*kind))
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn remaining_clock(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
