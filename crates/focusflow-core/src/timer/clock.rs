//! One-second countdown.
//!
//! The clock has no scheduler of its own. Whoever drives it calls [`tick`]
//! once per elapsed second, and only while the session is active; a paused
//! session therefore resumes with exactly the time it had.

use super::controller::SessionState;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Session inactive, nothing changed.
    Idle,
    /// One second was taken off `time_left`.
    Counted,
    /// The countdown was already at zero. The session is now inactive until
    /// the completion transition runs.
    Completed,
}

/// Advance the countdown by one second.
///
/// Zero is terminal: a tick at zero reports completion and deactivates the
/// session instead of going negative, so a second tick at the same zero
/// crossing is `Idle` and cannot complete twice.
pub fn tick(state: &mut SessionState) -> Tick {
    if !state.is_active {
        return Tick::Idle;
    }
    if state.time_left > 0 {
        state.time_left -= 1;
        Tick::Counted
    } else {
        state.is_active = false;
        Tick::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::timer::Mode;

    fn active(time_left: u64) -> SessionState {
        SessionState {
            mode: Mode::Work,
            time_left,
            is_active: true,
            sessions_completed: 0,
        }
    }

    #[test]
    fn active_tick_decrements() {
        let mut s = active(10);
        assert_eq!(tick(&mut s), Tick::Counted);
        assert_eq!(s.time_left, 9);
        assert!(s.is_active);
    }

    #[test]
    fn tick_at_zero_completes_without_underflow() {
        let mut s = active(0);
        assert_eq!(tick(&mut s), Tick::Completed);
        assert_eq!(s.time_left, 0);
        assert!(!s.is_active);
    }

    #[test]
    fn completion_fires_once_per_zero_crossing() {
        let mut s = active(1);
        assert_eq!(tick(&mut s), Tick::Counted);
        assert_eq!(tick(&mut s), Tick::Completed);
        assert_eq!(tick(&mut s), Tick::Idle);
    }

    #[test]
    fn paused_tick_is_a_no_op() {
        let mut s = SessionState::new(&Settings::default());
        assert_eq!(tick(&mut s), Tick::Idle);
        assert_eq!(s.time_left, 1500);
    }
}
