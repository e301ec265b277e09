//! Row-store port adapters over [`BackendClient`].
//!
//! Tables:
//!
//! - `profiles` - one row per identity
//! - `investor_profiles` / `syndicator_profiles` - role extension rows
//! - `favorites` - unique on `(investor_id, deal_id)`
//! - `site_settings` - singleton

use async_trait::async_trait;

use dealgrid_core::IdentityId;

use super::{BackendClient, BackendError};
use crate::models::{Favorite, Profile, RoleProfile, SiteSettings};
use crate::session::ports::{FavoriteStore, ProfileStore, SettingsStore};

/// [`ProfileStore`] over the hosted row API.
#[derive(Clone)]
pub struct BackendProfileStore {
    client: BackendClient,
}

impl BackendProfileStore {
    /// Create a profile store over a backend client.
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileStore for BackendProfileStore {
    async fn find_profile(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Profile>, BackendError> {
        self.client
            .select_one("profiles", "identity_id", identity_id.as_str())
            .await
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.client.insert("profiles", profile).await
    }

    async fn insert_role_profile(&self, profile: &RoleProfile) -> Result<(), BackendError> {
        match profile {
            RoleProfile::Investor(row) => self.client.insert("investor_profiles", row).await,
            RoleProfile::Syndicator(row) => self.client.insert("syndicator_profiles", row).await,
        }
    }
}

/// [`FavoriteStore`] over the hosted row API.
#[derive(Clone)]
pub struct BackendFavoriteStore {
    client: BackendClient,
}

impl BackendFavoriteStore {
    /// Create a favorite store over a backend client.
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FavoriteStore for BackendFavoriteStore {
    async fn upsert_favorite(&self, favorite: &Favorite) -> Result<(), BackendError> {
        // The pair uniqueness constraint makes replays no-ops server-side.
        self.client
            .upsert("favorites", favorite, "investor_id,deal_id")
            .await
    }
}

/// [`SettingsStore`] over the hosted row API.
#[derive(Clone)]
pub struct BackendSettingsStore {
    client: BackendClient,
}

impl BackendSettingsStore {
    /// Create a settings store over a backend client.
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SettingsStore for BackendSettingsStore {
    async fn fetch_site_settings(&self) -> Result<SiteSettings, BackendError> {
        // A missing settings row leaves the site open.
        let row: Option<SiteSettings> = self.client.select_first("site_settings").await?;
        Ok(row.unwrap_or_default())
    }
}
