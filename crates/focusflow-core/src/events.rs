use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::timer::{Mode, Snapshot};

/// Every state change in the timer produces an Event.
/// The CLI prints them; nothing in the core depends on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero and the next mode was entered.
    TimerCompleted {
        from: Mode,
        to: Mode,
        sessions_completed: u32,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    /// The user skipped ahead; same transition as a completion.
    TimerSkipped {
        from: Mode,
        to: Mode,
        sessions_completed: u32,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: Mode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: Settings,
        /// Whether the untouched current interval was resized.
        rescaled: bool,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: Snapshot,
        at: DateTime<Utc>,
    },
}
