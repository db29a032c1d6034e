//! The session state machine.
//!
//! - [`mode`]: the three phases and their durations
//! - [`clock`]: one-second countdown
//! - [`sequencer`]: what comes after a completed interval
//! - [`controller`]: the public command surface tying the three together

mod clock;
mod controller;
mod mode;
mod sequencer;

pub use clock::{tick, Tick};
pub use controller::{format_clock, Outcome, SessionController, SessionState, Snapshot};
pub use mode::{duration_for, Mode, ParseModeError};
pub use sequencer::{cycle_position, effective_interval, next_mode, transition, Transition};
