//! Session controller.
//!
//! Owns the single [`SessionState`] and the settings it runs under. Every
//! command mutates the state in place and returns an [`Outcome`]: the
//! events describing what happened and the side effects the caller must
//! perform. The controller itself never touches storage, audio or the
//! network.
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = SessionController::new(settings);
//! controller.toggle();
//! // Once per second while active:
//! let outcome = controller.tick(); // completion effects when an interval ends
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::{self, Tick};
use super::mode::{duration_for, Mode};
use super::sequencer::{self, cycle_position, effective_interval, Transition};
use crate::effects::Effect;
use crate::events::Event;
use crate::settings::Settings;

/// Mutable timer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub mode: Mode,
    /// Seconds remaining in the current interval.
    pub time_left: u64,
    pub is_active: bool,
    /// Completed (or skipped) work intervals.
    pub sessions_completed: u32,
}

impl SessionState {
    /// Fresh state: work mode, full work duration, paused, nothing completed.
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: Mode::Work,
            time_left: duration_for(Mode::Work, settings),
            is_active: false,
            sessions_completed: 0,
        }
    }
}

/// Events and effects produced by one command.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub events: Vec<Event>,
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn event(event: Event) -> Self {
        Self {
            events: vec![event],
            effects: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.effects.is_empty()
    }
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub mode: Mode,
    pub label: String,
    pub time_left_secs: u64,
    /// `MM:SS`
    pub display: String,
    pub total_secs: u64,
    /// 0.0 .. 1.0 progress through the current interval.
    pub progress: f64,
    pub is_active: bool,
    pub sessions_completed: u32,
    /// 1-based position in the long-break cycle.
    pub round: u32,
    pub interval: u32,
}

/// Format seconds as zero-padded `MM:SS`. Minutes are not wrapped at 60.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// The timer state machine.
#[derive(Debug, Clone)]
pub struct SessionController {
    state: SessionState,
    settings: Settings,
}

impl SessionController {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: SessionState::new(&settings),
            settings,
        }
    }

    /// Resume from a previously saved state.
    ///
    /// `time_left` is clamped to the current mode's duration in case the
    /// settings shrank since the state was saved.
    pub fn restore(mut state: SessionState, settings: Settings) -> Self {
        state.time_left = state.time_left.min(duration_for(state.mode, &settings));
        Self { state, settings }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn total_secs(&self) -> u64 {
        duration_for(self.state.mode, &self.settings)
    }

    pub fn snapshot(&self) -> Snapshot {
        let total = self.total_secs();
        let progress = if total == 0 {
            0.0
        } else {
            1.0 - (self.state.time_left as f64 / total as f64)
        };
        let interval = effective_interval(&self.settings);
        Snapshot {
            mode: self.state.mode,
            label: self.state.mode.label().to_string(),
            time_left_secs: self.state.time_left,
            display: format_clock(self.state.time_left),
            total_secs: total,
            progress,
            is_active: self.state.is_active,
            sessions_completed: self.state.sessions_completed,
            round: cycle_position(self.state.sessions_completed, interval) + 1,
            interval,
        }
    }

    pub fn snapshot_event(&self) -> Event {
        Event::StateSnapshot {
            snapshot: self.snapshot(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start if paused, pause if running.
    pub fn toggle(&mut self) -> Outcome {
        if self.state.is_active {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Start the countdown. No-op when already running.
    pub fn start(&mut self) -> Outcome {
        if self.state.is_active {
            return Outcome::default();
        }
        self.state.is_active = true;
        Outcome::event(Event::TimerStarted {
            mode: self.state.mode,
            time_left_secs: self.state.time_left,
            at: Utc::now(),
        })
    }

    /// Stop the countdown where it is. No-op when already paused.
    pub fn pause(&mut self) -> Outcome {
        if !self.state.is_active {
            return Outcome::default();
        }
        self.state.is_active = false;
        Outcome::event(Event::TimerPaused {
            mode: self.state.mode,
            time_left_secs: self.state.time_left,
            at: Utc::now(),
        })
    }

    /// Pause and rewind the current interval. Mode and count are kept.
    pub fn reset(&mut self) -> Outcome {
        self.state.is_active = false;
        self.state.time_left = self.total_secs();
        Outcome::event(Event::TimerReset {
            mode: self.state.mode,
            time_left_secs: self.state.time_left,
            at: Utc::now(),
        })
    }

    /// Finish the current interval now, exactly as if it had run out.
    pub fn skip(&mut self) -> Outcome {
        let t = sequencer::transition(&mut self.state, &self.settings);
        self.finish(t, true)
    }

    /// Jump to `mode` with a full interval.
    ///
    /// Bypasses the sequencer: the completed count is untouched and the
    /// running/paused flag is left as it was.
    pub fn set_mode(&mut self, mode: Mode) -> Outcome {
        self.state.mode = mode;
        self.state.time_left = duration_for(mode, &self.settings);
        Outcome::event(Event::ModeChanged {
            mode,
            time_left_secs: self.state.time_left,
            at: Utc::now(),
        })
    }

    /// Advance the clock by one second.
    pub fn tick(&mut self) -> Outcome {
        match clock::tick(&mut self.state) {
            Tick::Idle | Tick::Counted => Outcome::default(),
            Tick::Completed => {
                let t = sequencer::transition(&mut self.state, &self.settings);
                self.finish(t, false)
            }
        }
    }

    /// Replace the settings on behalf of the user.
    ///
    /// Persists locally and asks for a remote push.
    pub fn update_settings(&mut self, settings: Settings) -> Outcome {
        let mut outcome = self.replace_settings(settings);
        outcome
            .effects
            .push(Effect::SyncSettings(self.settings.clone()));
        outcome
    }

    /// Merge settings found in a remote profile over the current ones.
    ///
    /// Same path as [`update_settings`](Self::update_settings), minus the
    /// push back to the profile the values came from.
    pub fn apply_remote_settings(&mut self, partial: &Value) -> Outcome {
        let merged = self.settings.merge(partial);
        self.replace_settings(merged)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn replace_settings(&mut self, settings: Settings) -> Outcome {
        let old_total = duration_for(self.state.mode, &self.settings);
        let new_total = duration_for(self.state.mode, &settings);
        // Only an untouched, paused interval is resized.
        let rescaled =
            !self.state.is_active && self.state.time_left == old_total && old_total != new_total;
        if rescaled {
            self.state.time_left = new_total;
        }
        self.settings = settings;

        Outcome {
            events: vec![Event::SettingsUpdated {
                settings: self.settings.clone(),
                rescaled,
                time_left_secs: self.state.time_left,
                at: Utc::now(),
            }],
            effects: vec![Effect::PersistSettings(self.settings.clone())],
        }
    }

    fn finish(&mut self, t: Transition, skipped: bool) -> Outcome {
        tracing::debug!(
            from = ?t.from,
            to = ?t.to,
            sessions_completed = t.sessions_completed,
            auto_start = t.auto_start,
            skipped,
            "interval finished"
        );
        let at = Utc::now();
        let event = if skipped {
            Event::TimerSkipped {
                from: t.from,
                to: t.to,
                sessions_completed: t.sessions_completed,
                auto_started: t.auto_start,
                at,
            }
        } else {
            Event::TimerCompleted {
                from: t.from,
                to: t.to,
                sessions_completed: t.sessions_completed,
                auto_started: t.auto_start,
                at,
            }
        };
        Outcome {
            events: vec![event],
            effects: Effect::on_completion(t.from),
        }
    }
}
