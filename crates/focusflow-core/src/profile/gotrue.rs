//! [`RemoteProfile`] over a GoTrue-compatible auth REST API.
//!
//! Endpoints used, relative to the configured base URL:
//! - `POST auth/v1/token?grant_type=password`
//! - `POST auth/v1/token?grant_type=refresh_token`
//! - `POST auth/v1/signup`
//! - `PUT  auth/v1/user` (profile metadata)
//! - `POST auth/v1/logout`
//!
//! Every request carries the public `apikey` header.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use url::Url;

use super::{AuthChange, AuthSession, Identity, RemoteProfile, SignUpOutcome};
use crate::error::AuthError;
use crate::settings::Settings;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(ts), _) => DateTime::from_timestamp(ts, 0),
            (None, Some(secs)) => Some(now + Duration::seconds(secs)),
            (None, None) => None,
        };
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            identity: Identity {
                id: self.user.id,
                email: self.user.email,
            },
            profile_metadata: self.user.user_metadata,
        }
    }
}

/// HTTP client for a GoTrue auth server.
pub struct GoTrueClient {
    http: Client,
    base: Url,
    anon_key: String,
    session: Mutex<Option<AuthSession>>,
    changes: broadcast::Sender<AuthChange>,
}

impl GoTrueClient {
    /// Create a client for `base_url` (e.g. `https://project.example.co`).
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, AuthError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            http: Client::new(),
            base: Url::parse(&normalized)?,
            anon_key: anon_key.into(),
            session: Mutex::new(None),
            changes,
        })
    }

    /// Seed the client with a previously persisted session.
    pub fn with_session(self, session: Option<AuthSession>) -> Self {
        *self.lock() = session;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached(&self) -> Option<AuthSession> {
        self.lock().clone()
    }

    fn replace(&self, session: Option<AuthSession>) {
        *self.lock() = session;
    }

    fn emit(&self, change: AuthChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AuthError> {
        let url = self.base.join(path)?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key))
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: Value,
        fallback: &str,
    ) -> Result<AuthSession, AuthError> {
        let resp = self
            .request(Method::POST, "auth/v1/token")?
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejection(resp, fallback).await);
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.token_grant(
            "refresh_token",
            json!({ "refresh_token": refresh_token }),
            "Session expired",
        )
        .await
    }
}

/// Turn a non-2xx response into the user-facing message it carries.
async fn rejection(resp: Response, fallback: &str) -> AuthError {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string());
    tracing::debug!(%status, %message, "auth request rejected");
    AuthError::Rejected(message)
}

#[async_trait]
impl RemoteProfile for GoTrueClient {
    async fn current_session(&self) -> Option<AuthSession> {
        let session = self.cached()?;
        if !session.is_expired(Utc::now()) {
            return Some(session);
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            self.replace(None);
            self.emit(AuthChange::SignedOut);
            return None;
        };
        match self.refresh(refresh_token).await {
            Ok(fresh) => {
                self.replace(Some(fresh.clone()));
                self.emit(AuthChange::TokenRefreshed(fresh.clone()));
                Some(fresh)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                self.replace(None);
                self.emit(AuthChange::SignedOut);
                None
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .token_grant(
                "password",
                json!({ "email": email, "password": password }),
                "Failed to sign in",
            )
            .await?;
        self.replace(Some(session.clone()));
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let resp = self
            .request(Method::POST, "auth/v1/signup")?
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejection(resp, "Failed to sign up").await);
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        // Without email confirmation the server answers with a full session,
        // otherwise with the bare user.
        if body.get("access_token").and_then(Value::as_str).is_none() {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let session = token.into_session(Utc::now());
        self.replace(Some(session.clone()));
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.cached() else {
            return Ok(());
        };
        let result = match self.request(Method::POST, "auth/v1/logout") {
            Ok(req) => match req.bearer_auth(&session.access_token).send().await {
                Ok(resp) if resp.status().is_success() => Ok(()),
                Ok(resp) => Err(rejection(resp, "Failed to sign out").await),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        self.replace(None);
        self.emit(AuthChange::SignedOut);
        result
    }

    async fn update_profile_metadata(&self, settings: &Settings) -> Result<(), AuthError> {
        let session = self
            .current_session()
            .await
            .ok_or(AuthError::NotAuthenticated)?;
        let resp = self
            .request(Method::PUT, "auth/v1/user")?
            .bearer_auth(&session.access_token)
            .json(&json!({ "data": { "settings": settings } }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(rejection(resp, "Failed to update profile").await);
        }
        let user: UserResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let updated = {
            let mut cached = self.lock();
            match cached.as_mut().filter(|s| s.identity.id == user.id) {
                Some(current) => {
                    current.profile_metadata = user.user_metadata;
                    Some(current.clone())
                }
                None => None,
            }
        };
        if let Some(session) = updated {
            self.emit(AuthChange::ProfileUpdated(session));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn token_body(metadata: Value) -> String {
        json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "a@example.com", "user_metadata": metadata }
        })
        .to_string()
    }

    fn expired_session() -> AuthSession {
        AuthSession {
            access_token: "old".into(),
            refresh_token: Some("refresh-0".into()),
            expires_at: Some(Utc::now() - Duration::minutes(5)),
            identity: Identity {
                id: "user-1".into(),
                email: None,
            },
            profile_metadata: Value::Null,
        }
    }

    #[tokio::test]
    async fn sign_in_returns_session_and_broadcasts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .match_header("apikey", "anon")
            .match_body(Matcher::Json(json!({ "email": "a@example.com", "password": "pw" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(json!({ "settings": { "workDuration": 50 } })))
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        let mut rx = client.subscribe();
        let session = client.sign_in("a@example.com", "pw").await.unwrap();

        mock.assert_async().await;
        assert_eq!(session.identity.id, "user-1");
        assert_eq!(session.settings_patch().unwrap()["workDuration"], 50);
        assert!(session.expires_at.is_some());
        assert!(matches!(rx.recv().await.unwrap(), AuthChange::SignedIn(_)));
        assert_eq!(client.current_session().await, Some(session));
    }

    #[tokio::test]
    async fn sign_in_failure_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(
                json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        let err = client.sign_in("a@example.com", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(client.current_session().await.is_none());
    }

    #[tokio::test]
    async fn sign_in_failure_without_message_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        let err = client.sign_in("a@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to sign in");
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(
                json!({
                    "id": "user-2",
                    "email": "b@example.com",
                    "confirmation_sent_at": "2024-01-01T00:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        let outcome = client.sign_up("b@example.com", "pw").await.unwrap();
        assert!(outcome.requires_confirmation());
        assert!(client.current_session().await.is_none());
    }

    #[tokio::test]
    async fn sign_up_with_session_signs_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(token_body(json!({})))
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        let outcome = client.sign_up("a@example.com", "pw").await.unwrap();
        assert!(!outcome.requires_confirmation());
        assert!(client.current_session().await.is_some());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .match_body(Matcher::Json(json!({ "refresh_token": "refresh-0" })))
            .with_status(200)
            .with_body(token_body(json!({})))
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon")
            .unwrap()
            .with_session(Some(expired_session()));
        let mut rx = client.subscribe();
        let session = client.current_session().await.unwrap();

        mock.assert_async().await;
        assert_eq!(session.access_token, "access-1");
        assert!(matches!(rx.recv().await.unwrap(), AuthChange::TokenRefreshed(_)));
    }

    #[tokio::test]
    async fn failed_refresh_signs_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"msg":"Invalid Refresh Token"}"#)
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon")
            .unwrap()
            .with_session(Some(expired_session()));
        let mut rx = client.subscribe();
        assert!(client.current_session().await.is_none());
        assert_eq!(rx.recv().await.unwrap(), AuthChange::SignedOut);
    }

    #[tokio::test]
    async fn update_profile_metadata_sends_full_settings() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(token_body(json!({})))
            .create_async()
            .await;
        let settings = Settings {
            work_duration: 45,
            ..Settings::default()
        };
        let put = server
            .mock("PUT", "/auth/v1/user")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::Json(json!({ "data": { "settings": settings } })))
            .with_status(200)
            .with_body(json!({
                "id": "user-1",
                "user_metadata": { "settings": settings }
            }).to_string())
            .create_async()
            .await;

        let client = GoTrueClient::new(&server.url(), "anon").unwrap();
        client.sign_in("a@example.com", "pw").await.unwrap();
        let mut rx = client.subscribe();
        client.update_profile_metadata(&settings).await.unwrap();

        put.assert_async().await;
        let cached = client.current_session().await.unwrap();
        assert_eq!(cached.settings_patch().unwrap()["workDuration"], 45);
        match rx.recv().await.unwrap() {
            AuthChange::ProfileUpdated(session) => {
                assert_eq!(session.settings_patch().unwrap()["workDuration"], 45);
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_profile_metadata_requires_session() {
        let client = GoTrueClient::new("http://127.0.0.1:9", "anon").unwrap();
        let err = client
            .update_profile_metadata(&Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn sign_out_clears_session_even_when_server_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/logout")
            .with_status(500)
            .create_async()
            .await;

        let mut session = expired_session();
        session.expires_at = None;
        let client = GoTrueClient::new(&server.url(), "anon")
            .unwrap()
            .with_session(Some(session));
        let mut rx = client.subscribe();

        assert!(client.sign_out().await.is_err());
        assert!(client.current_session().await.is_none());
        assert_eq!(rx.recv().await.unwrap(), AuthChange::SignedOut);
    }

    #[test]
    fn base_url_without_trailing_slash_keeps_path() {
        let client = GoTrueClient::new("https://example.com/proxy", "anon").unwrap();
        assert_eq!(
            client.base.join("auth/v1/signup").unwrap().as_str(),
            "https://example.com/proxy/auth/v1/signup"
        );
    }
}
