pub mod auth;
pub mod config;
pub mod settings;
pub mod task;
pub mod timer;

use std::error::Error;
use std::sync::Arc;

use focusflow_core::driver::load_auth_session;
use focusflow_core::effects::Muted;
use focusflow_core::{AudioPlayer, AuthError, Config, Database, Driver, Event, GoTrueClient};
use serde::Serialize;

use crate::terminal::{StderrNotifier, TerminalBell};

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Everything a command needs: the driver over the local database and the
/// remote profile client when one is configured.
pub struct App {
    pub driver: Driver<Database>,
    pub remote: Option<Arc<GoTrueClient>>,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self, Box<dyn Error>> {
        let db = Database::open()?;
        let remote = match config.remote_url() {
            Some(url) => {
                let client = GoTrueClient::new(url, config.remote.anon_key.clone())?
                    .with_session(load_auth_session(&db));
                Some(Arc::new(client))
            }
            None => None,
        };

        let audio: Box<dyn AudioPlayer> = if config.alarm.enabled {
            Box::new(TerminalBell)
        } else {
            Box::new(Muted)
        };
        let notifier = Box::new(StderrNotifier::new(config.notifications.enabled));
        let mut driver =
            Driver::new(db, audio, notifier).with_alarm_url(config.alarm.sound_url.clone());

        if let Some(remote) = &remote {
            driver = driver.with_remote(remote.clone());
            let hydrated = driver.restore_session().await;
            tracing::debug!(events = hydrated.len(), "restored remote session");
        }
        Ok(Self { driver, remote })
    }

    pub fn remote(&self) -> Result<Arc<GoTrueClient>, AuthError> {
        self.remote.clone().ok_or(AuthError::NotConfigured)
    }

    /// Wait for background pushes before the process exits.
    pub async fn close(mut self) {
        self.driver.flush().await;
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_events(events: &[Event]) -> Result<(), serde_json::Error> {
    for event in events {
        print_json(event)?;
    }
    Ok(())
}
