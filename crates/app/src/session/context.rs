//! Injectable session context.
//!
//! Replaces ambient global auth state with an explicit, cloneable context
//! passed to whatever needs it. Created once at app start with the loading
//! flag raised; the bootstrapper populates it and lowers the flag, and
//! sign-out tears it down via [`SessionContext::clear`].

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::models::{Identity, Profile, SiteSettings};

/// Shared session state for the application process.
///
/// Cheaply cloneable; all clones observe the same state. The loading flag
/// lives in a `watch` channel so observers can await its (single)
/// transition to `false` instead of polling.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<RwLock<ContextInner>>,
    loading_tx: Arc<watch::Sender<bool>>,
}

#[derive(Default)]
struct ContextInner {
    identity: Option<Identity>,
    profile: Option<Profile>,
    settings: Option<SiteSettings>,
}

impl SessionContext {
    /// Create a fresh context with the loading flag raised.
    #[must_use]
    pub fn new() -> Self {
        let (loading_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(RwLock::new(ContextInner::default())),
            loading_tx: Arc::new(loading_tx),
        }
    }

    /// Record a signed-in identity and its provisioned profile.
    pub async fn begin_session(&self, identity: Identity, profile: Profile) {
        let mut inner = self.inner.write().await;
        inner.identity = Some(identity);
        inner.profile = Some(profile);
    }

    /// Tear down all identity state (sign-out, or failed provisioning).
    ///
    /// Site settings are process-wide, not per-session, and survive.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.identity = None;
        inner.profile = None;
    }

    /// The current identity, if signed in.
    pub async fn identity(&self) -> Option<Identity> {
        self.inner.read().await.identity.clone()
    }

    /// The current profile, if signed in and provisioned.
    pub async fn profile(&self) -> Option<Profile> {
        self.inner.read().await.profile.clone()
    }

    /// Record the fetched site settings.
    pub async fn set_settings(&self, settings: SiteSettings) {
        self.inner.write().await.settings = Some(settings);
    }

    /// Site settings, once fetched.
    pub async fn settings(&self) -> Option<SiteSettings> {
        self.inner.read().await.settings
    }

    /// Whether the initial bootstrap is still in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.loading_tx.borrow()
    }

    /// Lower the loading flag. Lowering an already-lowered flag is a no-op,
    /// so observers see at most one `true -> false` transition.
    pub fn finish_loading(&self) {
        self.loading_tx.send_if_modified(|loading| {
            if *loading {
                *loading = false;
                true
            } else {
                false
            }
        });
    }

    /// Watch the loading flag.
    #[must_use]
    pub fn loading_changes(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dealgrid_core::{Email, IdentityId};
    use crate::models::IdentityMetadata;

    fn identity() -> Identity {
        Identity {
            id: IdentityId::new("id-1"),
            email: Email::parse("a@b.c").unwrap(),
            metadata: IdentityMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_begin_and_clear_session() {
        let context = SessionContext::new();
        assert!(context.identity().await.is_none());

        let identity = identity();
        let profile = Profile::for_identity(&identity);
        context.begin_session(identity.clone(), profile).await;
        assert_eq!(context.identity().await, Some(identity));
        assert!(context.profile().await.is_some());

        context.clear().await;
        assert!(context.identity().await.is_none());
        assert!(context.profile().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_preserves_settings() {
        let context = SessionContext::new();
        context
            .set_settings(SiteSettings { require_auth: true })
            .await;
        context.clear().await;
        assert_eq!(
            context.settings().await,
            Some(SiteSettings { require_auth: true })
        );
    }

    #[tokio::test]
    async fn test_loading_clears_exactly_once() {
        let context = SessionContext::new();
        let mut watcher = context.loading_changes();
        assert!(context.is_loading());

        context.finish_loading();
        assert!(!context.is_loading());
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        // A second call must not produce another transition.
        context.finish_loading();
        assert!(!watcher.has_changed().unwrap());
    }
}
