//! Integration tests for settings and timer persistence through the driver.
//!
//! Uses a file-backed SQLite store so a "restart" is a fresh open of the
//! same database.

use focusflow_core::effects::{EffectError, Muted};
use focusflow_core::settings::{SETTINGS_KEY, TASK_KEY};
use focusflow_core::{
    AuthChange, AuthSession, Command, Database, Driver, Identity, KvStore, Mode,
    NotificationPermission, Notifier, Settings,
};
use serde_json::json;
use tempfile::TempDir;

struct Silent;

impl Notifier for Silent {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn request_permission(&mut self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

fn open(dir: &TempDir) -> Driver<Database> {
    let db = Database::open_at(&dir.path().join("focusflow.db")).unwrap();
    Driver::new(db, Box::new(Muted), Box::new(Silent))
}

#[test]
fn test_settings_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut driver = open(&dir);
        driver.dispatch(Command::UpdateSettings(Settings {
            work_duration: 45,
            long_break_interval: 3,
            ..Settings::default()
        }));
        driver.set_current_task("Refactor parser").unwrap();
    }

    let driver = open(&dir);
    assert_eq!(driver.settings().work_duration, 45);
    assert_eq!(driver.settings().long_break_interval, 3);
    assert_eq!(driver.state().time_left, 45 * 60);
    assert_eq!(driver.current_task(), "Refactor parser");
}

#[test]
fn test_partial_stored_settings_merge_over_defaults() {
    let dir = TempDir::new().unwrap();
    {
        let db = Database::open_at(&dir.path().join("focusflow.db")).unwrap();
        db.set(SETTINGS_KEY, r#"{"shortBreakDuration": 8, "workDuration": "long"}"#)
            .unwrap();
        db.set(TASK_KEY, "Inbox zero").unwrap();
    }

    let driver = open(&dir);
    assert_eq!(driver.settings().short_break_duration, 8);
    assert_eq!(driver.settings().work_duration, 25);
    assert_eq!(driver.current_task(), "Inbox zero");
}

#[test]
fn test_timer_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut driver = open(&dir);
        driver.dispatch(Command::Skip);
        driver.dispatch(Command::SetMode(Mode::LongBreak));
    }

    let driver = open(&dir);
    assert_eq!(driver.state().mode, Mode::LongBreak);
    assert_eq!(driver.state().sessions_completed, 1);
    assert_eq!(driver.state().time_left, 15 * 60);
}

#[test]
fn test_restored_time_is_clamped_to_shrunk_duration() {
    let dir = TempDir::new().unwrap();
    {
        let driver = open(&dir);
        driver.save_state();
        let db = Database::open_at(&dir.path().join("focusflow.db")).unwrap();
        db.set(SETTINGS_KEY, r#"{"workDuration": 10}"#).unwrap();
    }

    let driver = open(&dir);
    assert_eq!(driver.state().time_left, 600);
}

#[test]
fn test_profile_settings_hydrate_and_persist() {
    let dir = TempDir::new().unwrap();
    {
        let mut driver = open(&dir);
        driver.handle_auth_change(AuthChange::SignedIn(AuthSession {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at: None,
            identity: Identity {
                id: "user-9".into(),
                email: None,
            },
            profile_metadata: json!({ "settings": { "autoStartBreaks": true } }),
        }));
        assert!(driver.settings().auto_start_breaks);
        driver.handle_auth_change(AuthChange::SignedOut);
    }

    let driver = open(&dir);
    assert!(driver.settings().auto_start_breaks);
    assert!(driver.identity().is_none());
}
