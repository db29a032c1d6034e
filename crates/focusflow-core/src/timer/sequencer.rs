//! Mode sequencing: what follows a finished (or skipped) interval.
//!
//! ```text
//! Work --(count+1, count % interval != 0)--> ShortBreak --> Work
//! Work --(count+1, count % interval == 0)--> LongBreak  --> Work
//! ```
//!
//! Settings are read at transition time, never snapshotted at session
//! start, so an interval change mid-cycle applies to the very next check
//! without re-basing the completed count.

use super::controller::SessionState;
use super::mode::{duration_for, Mode};
use crate::settings::Settings;

/// Outcome of a completion or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    pub sessions_completed: u32,
    pub auto_start: bool,
}

/// Long-break interval actually used for the modulo check.
///
/// Zero can only come from a hand-edited or remote profile; it is treated as
/// the default interval.
pub fn effective_interval(settings: &Settings) -> u32 {
    match settings.long_break_interval {
        0 => Settings::default().long_break_interval,
        n => n,
    }
}

/// Position of `sessions_completed` within the long-break cycle.
pub fn cycle_position(sessions_completed: u32, interval: u32) -> u32 {
    sessions_completed % interval.max(1)
}

/// Decide the next mode without touching any state.
pub fn next_mode(current: Mode, sessions_completed: u32, settings: &Settings) -> Transition {
    match current {
        Mode::Work => {
            let completed = sessions_completed.saturating_add(1);
            let to = if cycle_position(completed, effective_interval(settings)) == 0 {
                Mode::LongBreak
            } else {
                Mode::ShortBreak
            };
            Transition {
                from: current,
                to,
                sessions_completed: completed,
                auto_start: settings.auto_start_breaks,
            }
        }
        Mode::ShortBreak | Mode::LongBreak => Transition {
            from: current,
            to: Mode::Work,
            sessions_completed,
            auto_start: settings.auto_start_pomodoros,
        },
    }
}

/// Apply the completion policy to `state`.
pub fn transition(state: &mut SessionState, settings: &Settings) -> Transition {
    let t = next_mode(state.mode, state.sessions_completed, settings);
    state.mode = t.to;
    state.sessions_completed = t.sessions_completed;
    state.time_left = duration_for(t.to, settings);
    state.is_active = t.auto_start;
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn work_goes_to_short_break_mid_cycle() {
        let t = next_mode(Mode::Work, 0, &Settings::default());
        assert_eq!(t.to, Mode::ShortBreak);
        assert_eq!(t.sessions_completed, 1);
        assert!(!t.auto_start);
    }

    #[test]
    fn work_goes_to_long_break_at_interval() {
        let t = next_mode(Mode::Work, 3, &Settings::default());
        assert_eq!(t.to, Mode::LongBreak);
        assert_eq!(t.sessions_completed, 4);
    }

    #[test]
    fn breaks_return_to_work_without_counting() {
        let settings = Settings {
            auto_start_pomodoros: true,
            ..Settings::default()
        };
        for mode in [Mode::ShortBreak, Mode::LongBreak] {
            let t = next_mode(mode, 7, &settings);
            assert_eq!(t.to, Mode::Work);
            assert_eq!(t.sessions_completed, 7);
            assert!(t.auto_start);
        }
    }

    #[test]
    fn interval_of_one_always_long_breaks() {
        let settings = Settings {
            long_break_interval: 1,
            ..Settings::default()
        };
        for n in 0..5 {
            assert_eq!(next_mode(Mode::Work, n, &settings).to, Mode::LongBreak);
        }
    }

    #[test]
    fn zero_interval_behaves_like_default() {
        let settings = Settings {
            long_break_interval: 0,
            ..Settings::default()
        };
        assert_eq!(effective_interval(&settings), 4);
        assert_eq!(next_mode(Mode::Work, 3, &settings).to, Mode::LongBreak);
    }

    #[test]
    fn interval_change_applies_to_next_check_without_rebase() {
        // Three sessions done under interval 4, then interval drops to 3.
        let settings = Settings {
            long_break_interval: 3,
            ..Settings::default()
        };
        // 4th completion: 4 % 3 != 0, so a short break, not a re-based long one.
        assert_eq!(next_mode(Mode::Work, 3, &settings).to, Mode::ShortBreak);
        // 6th completion lines up with the new interval.
        assert_eq!(next_mode(Mode::Work, 5, &settings).to, Mode::LongBreak);
    }

    #[test]
    fn transition_resets_time_from_current_settings() {
        let settings = Settings {
            short_break_duration: 7,
            auto_start_breaks: true,
            ..Settings::default()
        };
        let mut state = SessionState {
            mode: Mode::Work,
            time_left: 42,
            is_active: false,
            sessions_completed: 0,
        };
        let t = transition(&mut state, &settings);
        assert_eq!(t.to, Mode::ShortBreak);
        assert_eq!(state.time_left, 7 * 60);
        assert!(state.is_active);
        assert_eq!(state.sessions_completed, 1);
    }

    proptest! {
        #[test]
        fn long_break_exactly_on_multiples(interval in 1u32..=10, sessions in 1u32..=60) {
            let settings = Settings {
                long_break_interval: interval,
                ..Settings::default()
            };
            let mut state = SessionState::new(&settings);
            let mut long_breaks = Vec::new();
            for _ in 0..sessions {
                let t = transition(&mut state, &settings);
                if t.to == Mode::LongBreak {
                    long_breaks.push(t.sessions_completed);
                }
                // Back to work.
                transition(&mut state, &settings);
            }
            prop_assert_eq!(state.sessions_completed, sessions);
            let expected: Vec<u32> = (1..=sessions).filter(|n| n % interval == 0).collect();
            prop_assert_eq!(long_breaks, expected);
        }
    }
}
