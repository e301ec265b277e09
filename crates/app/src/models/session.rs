//! Session-related types.
//!
//! The identity and session shapes mirror what the hosted auth service
//! returns; auth-state transitions are broadcast as [`AuthEvent`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealgrid_core::{Email, IdentityId};

/// An authenticated principal as known to the hosted auth service.
///
/// Read-only input: the auth service owns the record, the application only
/// consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Opaque stable identifier issued by the auth service.
    pub id: IdentityId,
    /// Email address the identity signed up with.
    pub email: Email,
    /// Free-form metadata captured at sign-up (social providers fill this).
    #[serde(default)]
    pub metadata: IdentityMetadata,
}

/// Identity metadata as stored by the auth service.
///
/// All fields are optional; social sign-ins typically provide a name and
/// avatar, while `user_type` is only present when the sign-up form asked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IdentityMetadata {
    /// Full display name.
    pub full_name: Option<String>,
    /// Avatar image reference.
    pub avatar_url: Option<String>,
    /// Requested marketplace role (`investor` | `syndicator`).
    pub user_type: Option<String>,
}

/// An authentication session as observed by the application.
///
/// Token material stays inside the auth client; the workflow only needs
/// the identity and the expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// The authenticated identity.
    pub identity: Identity,
    /// When the current access token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Auth-state transitions consumed by the session bootstrapper.
///
/// Sign-in and token refresh are handled identically: both re-provision
/// the profile and then migrate guest favorites.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A user completed sign-in.
    SignedIn(AuthSession),
    /// An existing session's token was refreshed.
    TokenRefreshed(AuthSession),
    /// The session ended; all local identity state must be cleared.
    SignedOut,
}

/// On-device cache keys.
///
/// Keys are versioned so a format change never misparses stale data.
pub mod cache_keys {
    /// Key for the pre-authentication guest favorite set
    /// (JSON array of deal identifiers).
    pub const GUEST_FAVORITES: &str = "dealgrid.guest_favorites.v1";

    /// Key for the persisted auth session tokens.
    pub const AUTH_SESSION: &str = "dealgrid.auth_session.v1";
}
