//! # FocusFlow Core Library
//!
//! This library provides the core business logic for the FocusFlow Pomodoro
//! timer. The CLI binary is a thin terminal layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine. The caller invokes `tick()`
//!   once per second while the timer is active; the controller never
//!   spawns threads or performs I/O itself.
//! - **Effects**: every controller operation returns the side effects it
//!   wants (alarm, notification, persistence, remote sync) and a
//!   [`Driver`] executes them against the collaborators.
//! - **Settings**: user preferences persisted as a JSON blob in a local
//!   key-value store, optionally mirrored to a remote profile.
//! - **Profile**: remote identity provider used for cross-device settings
//!   sync. Entirely optional; offline use is fully supported.
//!
//! ## Key Components
//!
//! - [`SessionController`]: timer state machine
//! - [`SettingsStore`]: settings persistence and merging
//! - [`Driver`]: executes effects and bridges auth events
//! - [`Database`]: SQLite-backed key-value store
//! - [`Config`]: application configuration management
//! - [`RemoteProfile`]: trait for the identity/profile provider

pub mod driver;
pub mod effects;
pub mod error;
pub mod events;
pub mod profile;
pub mod quotes;
pub mod settings;
pub mod storage;
pub mod timer;

pub use driver::{Command, Driver};
pub use effects::{AudioPlayer, Effect, NotificationPermission, Notifier};
pub use error::{AuthError, ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use profile::{AuthChange, AuthSession, GoTrueClient, Identity, RemoteProfile, SignUpOutcome};
pub use settings::{Settings, SettingsStore};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{duration_for, Mode, Outcome, SessionController, SessionState, Snapshot};
