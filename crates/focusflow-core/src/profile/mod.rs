//! Remote identity provider used to carry settings between devices.
//!
//! The provider is an external collaborator: the timer only needs to know
//! who is signed in and what `settings` object their profile metadata
//! holds. Identity changes are pushed through a broadcast channel; a
//! subscriber unsubscribes by dropping its receiver.

mod gotrue;

pub use gotrue::GoTrueClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::settings::Settings;

/// Key under which the last auth session is persisted locally.
pub const AUTH_SESSION_KEY: &str = "auth-session";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials plus the profile they unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: Identity,
    /// Arbitrary key-value data attached to the identity.
    #[serde(default)]
    pub profile_metadata: Value,
}

impl AuthSession {
    /// The `settings` object stored in the profile, if any.
    pub fn settings_patch(&self) -> Option<&Value> {
        self.profile_metadata
            .get("settings")
            .filter(|v| v.is_object())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Identity change pushed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    /// Profile metadata was written; carries the session with the new data.
    ProfileUpdated(AuthSession),
    SignedOut,
}

impl AuthChange {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthChange::SignedIn(s)
            | AuthChange::TokenRefreshed(s)
            | AuthChange::ProfileUpdated(s) => Some(s),
            AuthChange::SignedOut => None,
        }
    }
}

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in.
    SignedIn(AuthSession),
    /// Account created; the user must confirm their email first.
    ConfirmationRequired,
}

impl SignUpOutcome {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, SignUpOutcome::ConfirmationRequired)
    }
}

/// Identity provider with a per-user metadata blob.
#[async_trait]
pub trait RemoteProfile: Send + Sync {
    /// Current session, restoring or refreshing it if needed.
    async fn current_session(&self) -> Option<AuthSession>;

    /// Receive every identity change from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// End the session. Local state is cleared even if the provider fails.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Store `settings` in the signed-in user's profile metadata.
    async fn update_profile_metadata(&self, settings: &Settings) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(metadata: Value) -> AuthSession {
        AuthSession {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at: None,
            identity: Identity {
                id: "u1".into(),
                email: None,
            },
            profile_metadata: metadata,
        }
    }

    #[test]
    fn settings_patch_requires_object() {
        assert!(session(json!({})).settings_patch().is_none());
        assert!(session(json!({ "settings": 3 })).settings_patch().is_none());
        assert_eq!(
            session(json!({ "settings": { "workDuration": 30 } })).settings_patch(),
            Some(&json!({ "workDuration": 30 }))
        );
    }

    #[test]
    fn expiry_check() {
        let mut s = session(Value::Null);
        let now = Utc::now();
        assert!(!s.is_expired(now));
        s.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(s.is_expired(now));
    }
}
