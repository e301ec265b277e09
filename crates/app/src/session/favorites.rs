//! Guest favorites migration.
//!
//! Visitors can save deals before signing in; the selections live in the
//! on-device cache as a JSON array of deal identifiers. On sign-in the set
//! is migrated into the backend exactly once and the cache key cleared, so
//! a later signed-out session starts empty.

use std::sync::Arc;

use dealgrid_core::{DealId, IdentityId};

use super::ports::{FavoriteStore, GuestCache};
use crate::cache::CacheError;
use crate::models::Favorite;
use crate::models::session::cache_keys;

/// Outcome of one migration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Favorites successfully upserted.
    pub migrated: usize,
    /// Entries whose upsert failed (logged, not retried).
    pub failed: usize,
}

impl MigrationReport {
    /// Whether the pass touched anything at all.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.migrated == 0 && self.failed == 0
    }
}

/// Migrates the guest favorite set into the backend on sign-in.
#[derive(Clone)]
pub struct GuestFavoritesSync {
    cache: Arc<dyn GuestCache>,
    favorites: Arc<dyn FavoriteStore>,
}

impl GuestFavoritesSync {
    /// Create a synchronizer over the device cache and favorite store.
    #[must_use]
    pub const fn new(cache: Arc<dyn GuestCache>, favorites: Arc<dyn FavoriteStore>) -> Self {
        Self { cache, favorites }
    }

    /// Migrate the cached guest favorites for a freshly signed-in investor.
    ///
    /// An absent or unparseable cache entry is an immediate no-op. Entries
    /// are processed sequentially in cache order; a failed upsert is logged
    /// and counted but does not halt the remainder. The cache key is
    /// cleared after the pass, making the migration one-shot; the backend's
    /// pair uniqueness makes any replay idempotent.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` only for device-cache failures; backend upsert
    /// failures are absorbed into the report.
    pub async fn migrate(
        &self,
        investor_id: &IdentityId,
    ) -> Result<MigrationReport, CacheError> {
        let Some(raw) = self.cache.get(cache_keys::GUEST_FAVORITES).await? else {
            return Ok(MigrationReport::default());
        };

        let deal_ids = parse_favorites(&raw);
        if deal_ids.is_empty() {
            // Nothing usable: clear the stale entry and move on.
            self.cache.remove(cache_keys::GUEST_FAVORITES).await?;
            return Ok(MigrationReport::default());
        }

        let mut report = MigrationReport::default();
        for deal_id in deal_ids {
            let favorite = Favorite {
                investor_id: investor_id.clone(),
                deal_id: deal_id.clone(),
            };
            match self.favorites.upsert_favorite(&favorite).await {
                Ok(()) => report.migrated += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        investor = %investor_id,
                        deal = %deal_id,
                        error = %e,
                        "guest favorite upsert failed; continuing with remainder"
                    );
                }
            }
        }

        self.cache.remove(cache_keys::GUEST_FAVORITES).await?;
        tracing::info!(
            investor = %investor_id,
            migrated = report.migrated,
            failed = report.failed,
            "guest favorites migrated"
        );
        Ok(report)
    }
}

/// Parse the cached favorite set; invalid JSON is an empty set.
fn parse_favorites(raw: &str) -> Vec<DealId> {
    match serde_json::from_str::<Vec<DealId>>(raw) {
        Ok(deal_ids) => deal_ids,
        Err(e) => {
            tracing::debug!(error = %e, "guest favorites cache unparseable; treating as empty");
            Vec::new()
        }
    }
}
