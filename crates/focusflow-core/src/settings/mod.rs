//! User-tunable timer preferences.
//!
//! [`Settings`] is a value object: it is replaced wholesale, never patched in
//! place by the timer. Partial objects coming from local storage or from a
//! remote profile are layered over an existing value with [`Settings::merge`],
//! which never fails on missing, unknown or malformed keys.

mod store;

pub use store::{SettingsStore, SETTINGS_KEY, TASK_KEY};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Smallest long-break interval the settings editor accepts.
pub const MIN_LONG_BREAK_INTERVAL: u32 = 1;
/// Largest long-break interval the settings editor accepts.
pub const MAX_LONG_BREAK_INTERVAL: u32 = 10;

/// Timer preferences. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break_duration")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_pomodoros: bool,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
}

fn default_work_duration() -> u32 {
    25
}
fn default_short_break_duration() -> u32 {
    5
}
fn default_long_break_duration() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break_duration(),
            long_break_duration: default_long_break_duration(),
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            long_break_interval: default_long_break_interval(),
        }
    }
}

impl Settings {
    /// Every key the settings blob recognizes, in display order.
    pub const KEYS: [&'static str; 6] = [
        "workDuration",
        "shortBreakDuration",
        "longBreakDuration",
        "autoStartBreaks",
        "autoStartPomodoros",
        "longBreakInterval",
    ];

    /// Layer a partial settings object over `self`.
    ///
    /// Keys present in `partial` win, missing keys keep the current value,
    /// unknown keys are dropped. A recognized key whose value has the wrong
    /// type is skipped on its own. Anything that is not a JSON object leaves
    /// the settings untouched.
    pub fn merge(&self, partial: &Value) -> Settings {
        let mut merged = self.clone();
        let Some(obj) = partial.as_object() else {
            return merged;
        };

        overlay(obj, "workDuration", &mut merged.work_duration);
        overlay(obj, "shortBreakDuration", &mut merged.short_break_duration);
        overlay(obj, "longBreakDuration", &mut merged.long_break_duration);
        overlay(obj, "autoStartBreaks", &mut merged.auto_start_breaks);
        overlay(obj, "autoStartPomodoros", &mut merged.auto_start_pomodoros);
        overlay(obj, "longBreakInterval", &mut merged.long_break_interval);
        merged
    }

    /// Check the invariants the settings editor enforces.
    ///
    /// The timer itself tolerates any positive interval; this is the
    /// stricter check applied to values typed in by the user.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("workDuration", self.work_duration),
            ("shortBreakDuration", self.short_break_duration),
            ("longBreakDuration", self.long_break_duration),
        ] {
            if value == 0 {
                return Err(ValidationError::ZeroDuration { field });
            }
        }
        let interval_range = MIN_LONG_BREAK_INTERVAL..=MAX_LONG_BREAK_INTERVAL;
        if !interval_range.contains(&self.long_break_interval) {
            return Err(ValidationError::OutOfRange {
                field: "longBreakInterval",
                value: self.long_break_interval,
                min: MIN_LONG_BREAK_INTERVAL,
                max: MAX_LONG_BREAK_INTERVAL,
            });
        }
        Ok(())
    }

    /// Read one field as a display string.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        json.get(key).map(|v| v.to_string())
    }

    /// Return a copy with one field replaced from its string form.
    ///
    /// `longBreakInterval` is clamped into the editor's range rather than
    /// rejected; zero durations are rejected.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Settings, ValidationError> {
        let mut next = self.clone();
        match key {
            "workDuration" => next.work_duration = parse_minutes("workDuration", value)?,
            "shortBreakDuration" => {
                next.short_break_duration = parse_minutes("shortBreakDuration", value)?
            }
            "longBreakDuration" => {
                next.long_break_duration = parse_minutes("longBreakDuration", value)?
            }
            "autoStartBreaks" => next.auto_start_breaks = parse_flag(key, value)?,
            "autoStartPomodoros" => next.auto_start_pomodoros = parse_flag(key, value)?,
            "longBreakInterval" => {
                let n: u32 = parse_number(key, value)?;
                next.long_break_interval =
                    n.clamp(MIN_LONG_BREAK_INTERVAL, MAX_LONG_BREAK_INTERVAL);
            }
            other => return Err(ValidationError::UnknownKey(other.to_string())),
        }
        next.validate()?;
        Ok(next)
    }
}

fn overlay<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, slot: &mut T) {
    if let Some(raw) = obj.get(key) {
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(v) => *slot = v,
            Err(e) => tracing::debug!(key, error = %e, "ignoring malformed settings value"),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32, ValidationError> {
    value.trim().parse::<u32>().map_err(|e| ValidationError::InvalidValue {
        field: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_minutes(key: &'static str, value: &str) -> Result<u32, ValidationError> {
    match parse_number(key, value)? {
        0 => Err(ValidationError::ZeroDuration { field: key }),
        n => Ok(n),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(ValidationError::InvalidValue {
            field: key.to_string(),
            message: format!("expected true/false, got '{other}'"),
        }),
    }
}
