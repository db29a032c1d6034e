//! Effect executor.
//!
//! [`Driver`] owns the controller together with everything the controller
//! deliberately knows nothing about: the settings store, the alarm and
//! notification collaborators, and the optional remote profile. UI commands
//! and auth changes both enter through here and share one code path.
//!
//! Remote pushes are spawned on the ambient tokio runtime and never
//! awaited by the timer; [`Driver::flush`] lets a short-lived process wait
//! for them before exiting.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::effects::{AudioPlayer, Effect, NotificationPermission, Notifier};
use crate::events::Event;
use crate::profile::{AuthChange, AuthSession, Identity, RemoteProfile, AUTH_SESSION_KEY};
use crate::settings::{Settings, SettingsStore};
use crate::storage::KvStore;
use crate::timer::{Mode, Outcome, SessionController, SessionState, Snapshot};

/// Key under which the last timer state is persisted.
pub const TIMER_STATE_KEY: &str = "timer-state";

/// UI command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle,
    Start,
    Pause,
    Reset,
    Skip,
    SetMode(Mode),
    UpdateSettings(Settings),
}

/// Runs the controller against real collaborators.
pub struct Driver<S: KvStore> {
    controller: SessionController,
    settings: SettingsStore<S>,
    audio: Box<dyn AudioPlayer>,
    notifier: Box<dyn Notifier>,
    remote: Option<Arc<dyn RemoteProfile>>,
    changes: Option<broadcast::Receiver<AuthChange>>,
    identity: Option<Identity>,
    alarm_url: String,
    pending: Vec<JoinHandle<()>>,
}

impl<S: KvStore> Driver<S> {
    /// Load settings and the last timer state from `store`.
    ///
    /// Asks for notification permission once if it is still undetermined.
    pub fn new(store: S, audio: Box<dyn AudioPlayer>, mut notifier: Box<dyn Notifier>) -> Self {
        let settings = SettingsStore::load(store);
        let controller = match load_state(settings.store()) {
            Some(state) => SessionController::restore(state, settings.settings().clone()),
            None => SessionController::new(settings.settings().clone()),
        };
        if notifier.permission() == NotificationPermission::Default {
            let granted = notifier.request_permission();
            tracing::debug!(?granted, "notification permission requested");
        }
        Self {
            controller,
            settings,
            audio,
            notifier,
            remote: None,
            changes: None,
            identity: None,
            alarm_url: crate::effects::DEFAULT_ALARM_URL.to_string(),
            pending: Vec::new(),
        }
    }

    /// Attach the remote profile used for settings sync.
    ///
    /// The driver subscribes to its changes right away; they are applied by
    /// [`drain_auth_changes`](Self::drain_auth_changes) and [`flush`](Self::flush).
    pub fn with_remote(mut self, remote: Arc<dyn RemoteProfile>) -> Self {
        self.changes = Some(remote.subscribe());
        self.remote = Some(remote);
        self
    }

    pub fn with_alarm_url(mut self, url: impl Into<String>) -> Self {
        self.alarm_url = url.into();
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn state(&self) -> &SessionState {
        self.controller.state()
    }

    pub fn settings(&self) -> &Settings {
        self.controller.settings()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.controller.snapshot()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteProfile>> {
        self.remote.as_ref()
    }

    pub fn current_task(&self) -> String {
        self.settings.current_task()
    }

    pub fn set_current_task(&self, label: &str) -> Result<(), crate::error::StorageError> {
        self.settings.set_current_task(label)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a UI command and perform its effects.
    pub fn dispatch(&mut self, command: Command) -> Vec<Event> {
        let outcome = match command {
            Command::Toggle => self.controller.toggle(),
            Command::Start => self.controller.start(),
            Command::Pause => self.controller.pause(),
            Command::Reset => self.controller.reset(),
            Command::Skip => self.controller.skip(),
            Command::SetMode(mode) => self.controller.set_mode(mode),
            Command::UpdateSettings(settings) => self.controller.update_settings(settings),
        };
        let events = self.perform(outcome);
        self.save_state();
        events
    }

    /// Advance the clock one second.
    ///
    /// State is only written back when an interval finishes; plain
    /// countdown ticks stay in memory.
    pub fn tick(&mut self) -> Vec<Event> {
        let outcome = self.controller.tick();
        let finished = !outcome.is_empty();
        let events = self.perform(outcome);
        if finished {
            self.save_state();
        }
        events
    }

    /// React to an identity change from the remote profile.
    ///
    /// Sign-in adopts the identity and merges any settings found in the
    /// profile. A refreshed token or a profile write only updates the stored
    /// session: local settings are already the newer copy. Sign-out drops
    /// the identity and keeps local settings.
    pub fn handle_auth_change(&mut self, change: AuthChange) -> Vec<Event> {
        match change {
            AuthChange::SignedIn(session) => self.adopt_session(session),
            AuthChange::TokenRefreshed(session) | AuthChange::ProfileUpdated(session) => {
                self.identity = Some(session.identity.clone());
                self.persist_session(&session);
                Vec::new()
            }
            AuthChange::SignedOut => {
                if let Some(identity) = self.identity.take() {
                    tracing::info!(user = %identity.id, "signed out");
                }
                if let Err(e) = self.settings.store().remove(AUTH_SESSION_KEY) {
                    tracing::warn!(error = %e, "failed to clear stored auth session");
                }
                Vec::new()
            }
        }
    }

    /// Restore the remote session at startup, hydrating settings from it.
    pub async fn restore_session(&mut self) -> Vec<Event> {
        let Some(remote) = self.remote.clone() else {
            return Vec::new();
        };
        match remote.current_session().await {
            Some(session) => self.adopt_session(session),
            // Dropped or unrefreshable session: forget the stored copy too.
            None => self.handle_auth_change(AuthChange::SignedOut),
        }
    }

    /// Persist the current timer state.
    pub fn save_state(&self) {
        let result = serde_json::to_string(self.controller.state())
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.settings
                    .store()
                    .set(TIMER_STATE_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist timer state");
        }
    }

    /// Apply every auth change the remote profile has published so far.
    pub fn drain_auth_changes(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(rx) = self.changes.as_mut() {
            match rx.try_recv() {
                Ok(change) => events.extend(self.handle_auth_change(change)),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed auth changes");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => self.changes = None,
            }
        }
        events
    }

    /// Wait for in-flight remote pushes, then record what they changed
    /// (refreshed tokens, updated profile metadata).
    pub async fn flush(&mut self) -> Vec<Event> {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "settings sync task failed");
            }
        }
        self.drain_auth_changes()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn adopt_session(&mut self, session: AuthSession) -> Vec<Event> {
        tracing::info!(user = %session.identity.id, "signed in");
        self.identity = Some(session.identity.clone());
        self.persist_session(&session);

        let Some(patch) = session.settings_patch() else {
            return Vec::new();
        };
        let outcome = self.controller.apply_remote_settings(patch);
        let events = self.perform(outcome);
        self.save_state();
        events
    }

    fn persist_session(&self, session: &AuthSession) {
        match serde_json::to_string(session) {
            Ok(json) => {
                if let Err(e) = self.settings.store().set(AUTH_SESSION_KEY, &json) {
                    tracing::warn!(error = %e, "failed to persist auth session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize auth session"),
        }
    }

    fn perform(&mut self, outcome: Outcome) -> Vec<Event> {
        for effect in outcome.effects {
            match effect {
                Effect::PlayAlarm => {
                    if let Err(e) = self.audio.play(&self.alarm_url) {
                        tracing::warn!(error = %e, "alarm playback failed");
                    }
                }
                Effect::Notify { title, body } => {
                    if self.notifier.permission() != NotificationPermission::Granted {
                        continue;
                    }
                    if let Err(e) = self.notifier.notify(&title, &body) {
                        tracing::warn!(error = %e, "notification failed");
                    }
                }
                Effect::PersistSettings(settings) => {
                    if let Err(e) = self.settings.save(settings) {
                        tracing::error!(error = %e, "failed to persist settings");
                    }
                }
                Effect::SyncSettings(settings) => self.push_settings(settings),
            }
        }
        outcome.events
    }

    fn push_settings(&mut self, settings: Settings) {
        let (Some(remote), Some(identity)) = (self.remote.clone(), self.identity.as_ref()) else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime available, settings not synced");
            return;
        };
        let user = identity.id.clone();
        self.pending.retain(|h| !h.is_finished());
        self.pending.push(handle.spawn(async move {
            match remote.update_profile_metadata(&settings).await {
                Ok(()) => tracing::debug!(%user, "settings synced to profile"),
                Err(e) => tracing::warn!(%user, error = %e, "failed to sync settings"),
            }
        }));
    }
}

fn load_state<S: KvStore>(store: &S) -> Option<SessionState> {
    let raw = match store.get(TIMER_STATE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read timer state");
            return None;
        }
    };
    match serde_json::from_str::<SessionState>(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable timer state");
            None
        }
    }
}

/// Parse a persisted auth session, treating corruption as absence.
pub fn load_auth_session<S: KvStore>(store: &S) -> Option<AuthSession> {
    let raw = store.get(AUTH_SESSION_KEY).ok()??;
    match serde_json::from_str::<Value>(&raw).and_then(serde_json::from_value) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable auth session");
            None
        }
    }
}
