//! User settings and goals.
//!
//! Settings are persisted as one TOML document through the [`Store`]
//! collaborator. Every field carries a serde default, so a document written
//! by an older build (or partially hand-edited) loads with the missing
//! fields filled in rather than being rejected.
//!
//! [`Store`]: crate::storage::Store

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timer::SessionType;

/// Accepted minutes per work session.
pub const WORK_MIN_RANGE: RangeInclusive<u32> = 1..=60;
pub const SHORT_BREAK_MIN_RANGE: RangeInclusive<u32> = 1..=30;
pub const LONG_BREAK_MIN_RANGE: RangeInclusive<u32> = 5..=60;
/// Accepted work sessions per cycle.
pub const CYCLE_LENGTH_RANGE: RangeInclusive<u32> = 2..=10;

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// Daily and weekly targets. Pure configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default = "default_daily_cycles")]
    pub daily_cycles: u32,
    #[serde(default = "default_weekly_cycles")]
    pub weekly_cycles: u32,
    /// Minutes of focus per day.
    #[serde(default = "default_daily_focus_min")]
    pub daily_focus_min: u32,
    /// Days.
    #[serde(default = "default_streak_target")]
    pub streak_target: u32,
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_work_min")]
    pub work_min: u32,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    /// Work sessions per rotation.
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_sound_type")]
    pub sound_type: String,
    /// 0..=100
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub goals: Goals,
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub work_min: Option<u32>,
    pub short_break_min: Option<u32>,
    pub long_break_min: Option<u32>,
    pub cycle_length: Option<u32>,
    pub sound_enabled: Option<bool>,
    pub sound_type: Option<String>,
    pub volume: Option<u8>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_work: Option<bool>,
    pub theme: Option<Theme>,
    pub goals: Option<Goals>,
}

fn default_work_min() -> u32 {
    25
}
fn default_short_break_min() -> u32 {
    5
}
fn default_long_break_min() -> u32 {
    15
}
fn default_cycle_length() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_sound_type() -> String {
    "default".into()
}
fn default_volume() -> u8 {
    80
}
fn default_daily_cycles() -> u32 {
    8
}
fn default_weekly_cycles() -> u32 {
    40
}
fn default_daily_focus_min() -> u32 {
    200
}
fn default_streak_target() -> u32 {
    7
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            daily_cycles: default_daily_cycles(),
            weekly_cycles: default_weekly_cycles(),
            daily_focus_min: default_daily_focus_min(),
            streak_target: default_streak_target(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_min: default_work_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            cycle_length: default_cycle_length(),
            sound_enabled: true,
            sound_type: default_sound_type(),
            volume: default_volume(),
            auto_start_breaks: false,
            auto_start_work: false,
            theme: Theme::Auto,
            goals: Goals::default(),
        }
    }
}

impl Settings {
    /// Planned duration in minutes for a session of `kind`.
    pub fn duration_for(&self, kind: SessionType) -> u32 {
        match kind {
            SessionType::Work => self.work_min,
            SessionType::ShortBreak => self.short_break_min,
            SessionType::LongBreak => self.long_break_min,
        }
    }

    /// Cycle length, never below one.
    pub fn effective_cycle_length(&self) -> u32 {
        self.cycle_length.max(1)
    }

    /// Whether a pending session of `kind` should start on its own.
    pub fn auto_starts(&self, kind: SessionType) -> bool {
        if kind.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }

    /// Notification volume scaled to 0.0..=1.0.
    pub fn volume_fraction(&self) -> f32 {
        f32::from(self.volume.min(100)) / 100.0
    }

    /// Merge a partial update into a copy of these settings.
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        let mut next = self.clone();
        if let Some(v) = patch.work_min {
            next.work_min = v;
        }
        if let Some(v) = patch.short_break_min {
            next.short_break_min = v;
        }
        if let Some(v) = patch.long_break_min {
            next.long_break_min = v;
        }
        if let Some(v) = patch.cycle_length {
            next.cycle_length = v;
        }
        if let Some(v) = patch.sound_enabled {
            next.sound_enabled = v;
        }
        if let Some(ref v) = patch.sound_type {
            next.sound_type = v.clone();
        }
        if let Some(v) = patch.volume {
            next.volume = v;
        }
        if let Some(v) = patch.auto_start_breaks {
            next.auto_start_breaks = v;
        }
        if let Some(v) = patch.auto_start_work {
            next.auto_start_work = v;
        }
        if let Some(v) = patch.theme {
            next.theme = v;
        }
        if let Some(ref v) = patch.goals {
            next.goals = v.clone();
        }
        next
    }

    /// Reject values the timer cannot run with.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounded = [
            ("work_min", self.work_min, WORK_MIN_RANGE),
            ("short_break_min", self.short_break_min, SHORT_BREAK_MIN_RANGE),
            ("long_break_min", self.long_break_min, LONG_BREAK_MIN_RANGE),
            ("cycle_length", self.cycle_length, CYCLE_LENGTH_RANGE),
        ];
        for (key, value, range) in bounded {
            if !range.contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!(
                        "must be between {} and {}",
                        range.start(),
                        range.end()
                    ),
                });
            }
        }
        if self.volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "volume".into(),
                message: "volume must be between 0 and 100".into(),
            });
        }
        Ok(())
    }

    /// Parse a persisted TOML document, filling in missing fields.
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML or a present
    /// field has the wrong type.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize for persistence.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Get a value as string by dot-separated key (e.g. `goals.daily_cycles`).
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with one dot-path value replaced.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value does not parse as
    /// the existing field's type, or the result fails validation.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Settings, ConfigError> {
        let mut json = serde_json::to_value(self)
            .map_err(|e| ConfigError::SerializeFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Settings = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;
        next.validate()?;
        Ok(next)
    }
}
