//! Terminal implementations of the alarm and notification collaborators.

use std::io::Write;

use focusflow_core::effects::EffectError;
use focusflow_core::{AudioPlayer, NotificationPermission, Notifier};

/// Rings the terminal bell in place of playing the alarm sound.
pub struct TerminalBell;

impl AudioPlayer for TerminalBell {
    fn play(&self, source_url: &str) -> Result<(), EffectError> {
        tracing::debug!(source_url, "ringing terminal bell");
        let mut err = std::io::stderr();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

/// Prints notifications to stderr. Permission comes from config.
pub struct StderrNotifier {
    permission: NotificationPermission,
}

impl StderrNotifier {
    pub fn new(enabled: bool) -> Self {
        let permission = if enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        Self { permission }
    }
}

impl Notifier for StderrNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError> {
        writeln!(std::io::stderr(), "\n[{title}] {body}")?;
        Ok(())
    }
}
