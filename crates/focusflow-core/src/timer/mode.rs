use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Timer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Work,
    ShortBreak,
    LongBreak,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Work, Mode::ShortBreak, Mode::LongBreak];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Work => "Focus",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Mode::Work)
    }

    /// Configured minutes for this mode, before any fallback.
    fn minutes(self, settings: &Settings) -> u32 {
        match self {
            Mode::Work => settings.work_duration,
            Mode::ShortBreak => settings.short_break_duration,
            Mode::LongBreak => settings.long_break_duration,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode '{}' (expected work, short-break or long-break)",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "focus" | "pomodoro" => Ok(Mode::Work),
            "short-break" | "shortbreak" | "short" => Ok(Mode::ShortBreak),
            "long-break" | "longbreak" | "long" => Ok(Mode::LongBreak),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Full length of `mode`'s interval in seconds under `settings`.
///
/// A zero duration can only arrive programmatically (the editor rejects
/// it); it is replaced by the default for that mode so an interval never
/// starts already finished.
pub fn duration_for(mode: Mode, settings: &Settings) -> u64 {
    let minutes = match mode.minutes(settings) {
        0 => mode.minutes(&Settings::default()),
        m => m,
    };
    u64::from(minutes) * 60
}
