//! Local persistence for [`Settings`] and the current task label.

use serde_json::Value;

use super::Settings;
use crate::error::StorageError;
use crate::storage::KvStore;

/// Key of the settings JSON blob.
pub const SETTINGS_KEY: &str = "pomodoro-settings-v1";
/// Key of the free-form task label.
pub const TASK_KEY: &str = "pomodoro-current-task";

/// Owns the in-memory settings and writes every replacement through to the
/// key-value store.
pub struct SettingsStore<S: KvStore> {
    store: S,
    settings: Settings,
}

impl<S: KvStore> SettingsStore<S> {
    /// Read settings from `store`, merged over the defaults.
    ///
    /// Never fails: an absent entry, a read error or an unparsable blob all
    /// fall back to defaults.
    pub fn load(store: S) -> Self {
        let settings = match store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(partial) => Settings::default().merge(&partial),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse stored settings, using defaults");
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored settings, using defaults");
                Settings::default()
            }
        };
        Self { store, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Combine a partial object over the current settings without storing it.
    pub fn merge(&self, partial: &Value) -> Settings {
        self.settings.merge(partial)
    }

    /// Replace the settings and persist the full object.
    ///
    /// The in-memory value is replaced even if the write fails, so the
    /// running timer keeps using what the user asked for.
    pub fn save(&mut self, settings: Settings) -> Result<(), StorageError> {
        self.settings = settings;
        let blob = serde_json::to_string(&self.settings)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.store.set(SETTINGS_KEY, &blob)
    }

    /// Current task label, empty when unset or unreadable.
    pub fn current_task(&self) -> String {
        match self.store.get(TASK_KEY) {
            Ok(label) => label.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read current task");
                String::new()
            }
        }
    }

    pub fn set_current_task(&self, label: &str) -> Result<(), StorageError> {
        self.store.set(TASK_KEY, label)
    }
}
