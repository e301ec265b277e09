//! Hosted auth service client.
//!
//! Implements the [`AuthGateway`] port over the platform's token endpoints:
//! password sign-in, refresh-token exchange, identity fetch, and sign-out.
//! The active session is persisted to the on-device cache so a restarted
//! app shell can restore it without re-prompting, and every auth-state
//! transition is broadcast as an [`AuthEvent`] for the session bootstrapper.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use url::Url;

use dealgrid_core::{Email, IdentityId};

use super::{BackendClient, BackendError};
use crate::config::BackendConfig;
use crate::models::session::cache_keys;
use crate::models::{AuthEvent, AuthSession, Identity, IdentityMetadata};
use crate::session::ports::{AuthGateway, GuestCache};

/// Capacity of the auth event channel. Events are tiny and consumers are
/// long-lived, so a small buffer suffices.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Client for the hosted auth service.
///
/// Cheaply cloneable. Token material never leaves this client; consumers
/// see only [`AuthSession`] values and [`AuthEvent`]s.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    cache: Arc<dyn GuestCache>,
    /// Row client to keep in sync with the signed-in user's bearer token.
    rows: BackendClient,
    session: RwLock<Option<SessionState>>,
    events: broadcast::Sender<AuthEvent>,
}

/// In-memory session state, including token material.
struct SessionState {
    session: AuthSession,
    access_token: String,
    refresh_token: String,
}

/// Persisted session shape for the on-device cache.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: Option<DateTime<Utc>>,
    identity: Identity,
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: IdentityPayload,
}

/// Identity record as returned by the auth service.
#[derive(Deserialize)]
struct IdentityPayload {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: IdentityMetadata,
}

impl IdentityPayload {
    fn into_identity(self) -> Result<Identity, BackendError> {
        let email = Email::parse(&self.email)
            .map_err(|e| BackendError::Invalid(format!("identity email: {e}")))?;
        Ok(Identity {
            id: IdentityId::new(self.id),
            email,
            metadata: self.user_metadata,
        })
    }
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// `rows` receives the signed-in user's bearer token so row requests
    /// run as that user; `cache` persists the session across restarts.
    #[must_use]
    pub fn new(config: &BackendConfig, cache: Arc<dyn GuestCache>, rows: BackendClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(AuthClientInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                cache,
                rows,
                session: RwLock::new(None),
                events,
            }),
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the session is stored, persisted, and a `SignedIn` event
    /// is broadcast.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` (401) for bad credentials, or other
    /// variants for request failures.
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let url = self.token_url("password")?;
        let response = self
            .inner
            .http
            .post(url)
            .header("apikey", self.inner.api_key.expose_secret())
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password,
            }))
            .send()
            .await?;

        let body = BackendClient::success_body(response).await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        let session = self.store_session(token).await?;

        tracing::info!(identity = %session.identity.id, "signed in");
        let _ = self.inner.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Exchange the persisted refresh token for a fresh session.
    async fn refresh_with_token(&self, refresh_token: String) -> Result<AuthSession, BackendError> {
        let url = self.token_url("refresh_token")?;
        let response = self
            .inner
            .http
            .post(url)
            .header("apikey", self.inner.api_key.expose_secret())
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let body = BackendClient::success_body(response).await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        self.store_session(token).await
    }

    /// Record a fresh token response in memory, the row client, and the
    /// on-device cache.
    async fn store_session(&self, token: TokenResponse) -> Result<AuthSession, BackendError> {
        let identity = token.user.into_identity()?;
        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        let session = AuthSession {
            identity: identity.clone(),
            expires_at,
        };

        let stored = StoredSession {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at,
            identity,
        };
        match serde_json::to_string(&stored) {
            Ok(json) => {
                if let Err(e) = self.inner.cache.set(cache_keys::AUTH_SESSION, &json).await {
                    tracing::warn!(error = %e, "failed to persist session to device cache");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize session for device cache"),
        }

        self.inner.rows.set_access_token(Some(token.access_token.clone()));

        let mut guard = self.inner.session.write().await;
        *guard = Some(SessionState {
            session: session.clone(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        });

        Ok(session)
    }

    /// Load the persisted session from the device cache into memory, once.
    async fn ensure_loaded(&self) {
        {
            let guard = self.inner.session.read().await;
            if guard.is_some() {
                return;
            }
        }

        let raw = match self.inner.cache.get(cache_keys::AUTH_SESSION).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                return;
            }
        };

        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                // A stale or corrupt entry is treated as signed out.
                tracing::debug!(error = %e, "discarding unreadable persisted session");
                return;
            }
        };

        self.inner
            .rows
            .set_access_token(Some(stored.access_token.clone()));

        let mut guard = self.inner.session.write().await;
        if guard.is_none() {
            *guard = Some(SessionState {
                session: AuthSession {
                    identity: stored.identity,
                    expires_at: stored.expires_at,
                },
                access_token: stored.access_token,
                refresh_token: stored.refresh_token,
            });
        }
    }

    fn token_url(&self, grant_type: &str) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.join("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }
}

#[async_trait]
impl AuthGateway for AuthClient {
    async fn refresh_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.ensure_loaded().await;

        let refresh_token = {
            let guard = self.inner.session.read().await;
            guard.as_ref().map(|state| state.refresh_token.clone())
        };
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        let session = self.refresh_with_token(refresh_token).await?;
        let _ = self
            .inner
            .events
            .send(AuthEvent::TokenRefreshed(session.clone()));
        Ok(Some(session))
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.ensure_loaded().await;

        let guard = self.inner.session.read().await;
        let Some(state) = guard.as_ref() else {
            return Ok(None);
        };

        // An expired access token without a successful refresh is no session.
        if let Some(expires_at) = state.session.expires_at
            && expires_at <= Utc::now()
        {
            return Ok(None);
        }

        Ok(Some(state.session.clone()))
    }

    async fn fetch_identity(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Identity>, BackendError> {
        let access_token = {
            let guard = self.inner.session.read().await;
            guard.as_ref().map(|state| state.access_token.clone())
        };
        let Some(access_token) = access_token else {
            return Ok(None);
        };

        let url = self.inner.base_url.join("auth/v1/user")?;
        let response = self
            .inner
            .http
            .get(url)
            .header("apikey", self.inner.api_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        let body = BackendClient::success_body(response).await?;
        let payload: IdentityPayload = serde_json::from_str(&body)?;
        let identity = payload.into_identity()?;

        if &identity.id != identity_id {
            tracing::warn!(
                requested = %identity_id,
                returned = %identity.id,
                "auth service returned a different identity than requested"
            );
            return Ok(None);
        }

        Ok(Some(identity))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let access_token = {
            let mut guard = self.inner.session.write().await;
            guard.take().map(|state| state.access_token)
        };

        self.inner.rows.set_access_token(None);
        if let Err(e) = self.inner.cache.remove(cache_keys::AUTH_SESSION).await {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }

        // Server-side revocation is best-effort; local state is already gone.
        if let Some(access_token) = access_token {
            let url = self.inner.base_url.join("auth/v1/logout")?;
            let result = self
                .inner
                .http
                .post(url)
                .header("apikey", self.inner.api_key.expose_secret())
                .bearer_auth(access_token)
                .send()
                .await;
            match result {
                Ok(response) => {
                    if let Err(e) = BackendClient::success_body(response).await {
                        tracing::warn!(error = %e, "server-side sign-out failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "server-side sign-out failed"),
            }
        }

        tracing::info!("signed out");
        let _ = self.inner.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}
