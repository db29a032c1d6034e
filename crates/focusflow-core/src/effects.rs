//! Side effects requested by the timer and the collaborators that carry
//! them out.
//!
//! The controller never performs I/O. It returns a list of [`Effect`]s and
//! the [`Driver`](crate::Driver) executes them. Alarm and notification
//! failures are logged and otherwise ignored.

use crate::settings::Settings;
use crate::timer::Mode;

/// Bell sound played when an interval ends.
pub const DEFAULT_ALARM_URL: &str =
    "https://assets.mixkit.co/active_storage/sfx/2869/2869-preview.mp3";

/// Title used for every notification.
pub const NOTIFICATION_TITLE: &str = "FocusFlow";

/// Error type returned by side-effect collaborators.
pub type EffectError = Box<dyn std::error::Error + Send + Sync>;

/// Work the driver must perform after a controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Play the alarm sound.
    PlayAlarm,
    /// Show a notification, if the user granted permission.
    Notify { title: String, body: String },
    /// Write the full settings object to local storage.
    PersistSettings(Settings),
    /// Push the full settings object to the remote profile, if signed in.
    SyncSettings(Settings),
}

impl Effect {
    /// Alarm + notification for the end of an interval in `finished` mode.
    pub fn on_completion(finished: Mode) -> Vec<Effect> {
        vec![
            Effect::PlayAlarm,
            Effect::Notify {
                title: NOTIFICATION_TITLE.to_string(),
                body: completion_message(finished).to_string(),
            },
        ]
    }
}

/// Notification body for the end of an interval in `finished` mode.
pub fn completion_message(finished: Mode) -> &'static str {
    match finished {
        Mode::Work => "Time for a break!",
        Mode::ShortBreak | Mode::LongBreak => "Break is over, time to focus!",
    }
}

/// Plays a sound. Fire-and-forget.
pub trait AudioPlayer: Send {
    fn play(&self, source_url: &str) -> Result<(), EffectError>;
}

/// Player that never makes a sound, for when the alarm is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct Muted;

impl AudioPlayer for Muted {
    fn play(&self, _source_url: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Whether the user allowed notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
}

/// Delivers user-visible notifications.
pub trait Notifier: Send {
    fn permission(&self) -> NotificationPermission;

    /// Ask the user. Only called while the permission is `Default`.
    fn request_permission(&mut self) -> NotificationPermission;

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError>;
}
