//! Port traits at the workflow's seams.
//!
//! The session workflow never talks to the hosted platform directly; it is
//! injected with implementations of these traits. Production wires the
//! `backend` clients, tests wire in-memory fakes.

use async_trait::async_trait;
use tokio::sync::broadcast;

use dealgrid_core::IdentityId;

use crate::backend::BackendError;
use crate::cache::CacheError;
use crate::models::{AuthEvent, AuthSession, Favorite, Identity, Profile, RoleProfile, SiteSettings};

/// The hosted auth service, as seen by the session workflow.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange the persisted refresh token for a fresh session.
    ///
    /// `Ok(None)` means there was nothing to refresh. Failure is not fatal
    /// to bootstrap; callers log it and treat it as "no session".
    async fn refresh_session(&self) -> Result<Option<AuthSession>, BackendError>;

    /// The currently active session, if any.
    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError>;

    /// Fetch the full identity record, including sign-up metadata.
    async fn fetch_identity(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Identity>, BackendError>;

    /// End the session: clear local token state and broadcast `SignedOut`.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Subscribe to auth-state transitions.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Profile and role sub-profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile for an identity; zero-or-one, never an error
    /// for "not found".
    async fn find_profile(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Profile>, BackendError>;

    /// Insert a freshly provisioned profile.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError>;

    /// Insert the role sub-profile matching a freshly provisioned profile.
    async fn insert_role_profile(&self, profile: &RoleProfile) -> Result<(), BackendError>;
}

/// Saved-deal rows, unique per `(investor_id, deal_id)`.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Idempotently record a favorite; replays are not errors.
    async fn upsert_favorite(&self, favorite: &Favorite) -> Result<(), BackendError>;
}

/// The site-wide settings singleton.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the settings row; a missing row yields the open default.
    async fn fetch_site_settings(&self) -> Result<SiteSettings, BackendError>;
}

/// The on-device key-value cache (local-storage analogue).
#[async_trait]
pub trait GuestCache: Send + Sync {
    /// Read a key's value, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a key's value, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Delete a key; removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}
