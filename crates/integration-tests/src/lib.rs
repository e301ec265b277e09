//! Test support for the session-workflow integration tests.
//!
//! Provides in-memory fakes for every port the workflow is injected with,
//! plus small builders for identities and sessions. The fakes record the
//! operations performed on them in a shared [`OpLog`] so tests can assert
//! ordering across collaborators (for example: provisioning before
//! favorites migration).

#![cfg_attr(not(test), forbid(unsafe_code))]
// Test-support crate: panicking on poisoned state is the desired behavior.
#![allow(clippy::unwrap_used)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use dealgrid_app::backend::BackendError;
use dealgrid_app::models::{
    AuthEvent, AuthSession, Favorite, Identity, IdentityMetadata, Profile, RoleProfile,
    SiteSettings,
};
use dealgrid_app::session::ports::{AuthGateway, FavoriteStore, ProfileStore, SettingsStore};
use dealgrid_core::{DealId, Email, IdentityId};

/// Shared, ordered record of operations performed across fakes.
#[derive(Clone, Default)]
pub struct OpLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OpLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, op: impl Into<String>) {
        self.entries.lock().unwrap().push(op.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Position of the first entry matching `op`, if any.
    #[must_use]
    pub fn position(&self, op: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == op)
    }
}

/// Build a test identity with the given id and metadata.
#[must_use]
pub fn identity_with(id: &str, metadata: IdentityMetadata) -> Identity {
    Identity {
        id: IdentityId::new(id),
        email: Email::parse(&format!("{id}@example.com")).unwrap(),
        metadata,
    }
}

/// Build a bare test identity (no metadata).
#[must_use]
pub fn identity(id: &str) -> Identity {
    identity_with(id, IdentityMetadata::default())
}

/// Wrap an identity in a non-expiring session.
#[must_use]
pub const fn session_for(identity: Identity) -> AuthSession {
    AuthSession {
        identity,
        expires_at: None,
    }
}

/// A transient server-side error.
#[must_use]
pub const fn transient_error() -> BackendError {
    BackendError::Status {
        status: 503,
        body: String::new(),
    }
}

/// A non-transient client-side error.
#[must_use]
pub const fn permanent_error() -> BackendError {
    BackendError::Status {
        status: 400,
        body: String::new(),
    }
}

/// Poll until `probe` yields true, panicking after two seconds.
///
/// Used to wait for the background auth-event listener to process an
/// emitted event.
pub async fn wait_until<F, Fut>(probe: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if probe().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within deadline"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// =============================================================================
// FakeAuth
// =============================================================================

/// In-memory [`AuthGateway`] with failure injection.
pub struct FakeAuth {
    events: broadcast::Sender<AuthEvent>,
    session: Mutex<Option<AuthSession>>,
    identities: Mutex<HashMap<IdentityId, Identity>>,
    refresh_fails: AtomicBool,
    current_fails: AtomicBool,
    fetch_identity_fails: AtomicBool,
    sign_out_calls: AtomicUsize,
    log: OpLog,
}

impl FakeAuth {
    #[must_use]
    pub fn new(log: OpLog) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            session: Mutex::new(None),
            identities: Mutex::new(HashMap::new()),
            refresh_fails: AtomicBool::new(false),
            current_fails: AtomicBool::new(false),
            fetch_identity_fails: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
            log,
        }
    }

    /// Register an identity as known to the auth service.
    pub fn register_identity(&self, identity: Identity) {
        self.identities
            .lock()
            .unwrap()
            .insert(identity.id.clone(), identity);
    }

    /// Set the persisted session that restore will find.
    pub fn set_session(&self, session: AuthSession) {
        self.register_identity(session.identity.clone());
        *self.session.lock().unwrap() = Some(session);
    }

    pub fn fail_refresh(&self) {
        self.refresh_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_current_session(&self) {
        self.current_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_identity_fetch(&self) {
        self.fetch_identity_fails.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Emit a sign-in event, as the auth service would after a password
    /// grant completes.
    pub fn emit_sign_in(&self, session: AuthSession) {
        self.register_identity(session.identity.clone());
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session));
    }

    pub fn emit_sign_out(&self) {
        *self.session.lock().unwrap() = None;
        let _ = self.events.send(AuthEvent::SignedOut);
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn refresh_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.log.record("refresh_session");
        if self.refresh_fails.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.log.record("current_session");
        if self.current_fails.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn fetch_identity(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Identity>, BackendError> {
        self.log.record("fetch_identity");
        if self.fetch_identity_fails.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(self.identities.lock().unwrap().get(identity_id).cloned())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.log.record("sign_out");
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// FakeStore
// =============================================================================

/// In-memory profile/favorite/settings store with failure injection.
pub struct FakeStore {
    profiles: Mutex<HashMap<IdentityId, Profile>>,
    role_profiles: Mutex<Vec<RoleProfile>>,
    favorites: Mutex<BTreeSet<Favorite>>,
    find_failures: Mutex<VecDeque<BackendError>>,
    insert_profile_fails: AtomicBool,
    role_profile_fails: AtomicBool,
    failing_deals: Mutex<HashSet<DealId>>,
    settings: Mutex<Result<SiteSettings, ()>>,
    find_calls: AtomicUsize,
    log: OpLog,
}

impl FakeStore {
    #[must_use]
    pub fn new(log: OpLog) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            role_profiles: Mutex::new(Vec::new()),
            favorites: Mutex::new(BTreeSet::new()),
            find_failures: Mutex::new(VecDeque::new()),
            insert_profile_fails: AtomicBool::new(false),
            role_profile_fails: AtomicBool::new(false),
            failing_deals: Mutex::new(HashSet::new()),
            settings: Mutex::new(Ok(SiteSettings::default())),
            find_calls: AtomicUsize::new(0),
            log,
        }
    }

    /// Seed an already-provisioned profile.
    pub fn seed_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.identity_id.clone(), profile);
    }

    /// Queue errors for the next profile lookups, served in order.
    pub fn fail_next_finds(&self, errors: impl IntoIterator<Item = BackendError>) {
        self.find_failures.lock().unwrap().extend(errors);
    }

    pub fn fail_profile_insert(&self) {
        self.insert_profile_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_role_profile_insert(&self) {
        self.role_profile_fails.store(true, Ordering::SeqCst);
    }

    /// Make upserts for one deal fail.
    pub fn fail_deal(&self, deal_id: DealId) {
        self.failing_deals.lock().unwrap().insert(deal_id);
    }

    pub fn set_site_settings(&self, settings: SiteSettings) {
        *self.settings.lock().unwrap() = Ok(settings);
    }

    pub fn fail_site_settings(&self) {
        *self.settings.lock().unwrap() = Err(());
    }

    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn profile(&self, identity_id: &IdentityId) -> Option<Profile> {
        self.profiles.lock().unwrap().get(identity_id).cloned()
    }

    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    #[must_use]
    pub fn role_profiles(&self) -> Vec<RoleProfile> {
        self.role_profiles.lock().unwrap().clone()
    }

    #[must_use]
    pub fn favorites(&self) -> Vec<Favorite> {
        self.favorites.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl ProfileStore for FakeStore {
    async fn find_profile(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Profile>, BackendError> {
        self.log.record("find_profile");
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.find_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.profiles.lock().unwrap().get(identity_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.log.record("insert_profile");
        if self.insert_profile_fails.load(Ordering::SeqCst) {
            return Err(permanent_error());
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.identity_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_role_profile(&self, profile: &RoleProfile) -> Result<(), BackendError> {
        self.log.record("insert_role_profile");
        if self.role_profile_fails.load(Ordering::SeqCst) {
            return Err(permanent_error());
        }
        self.role_profiles.lock().unwrap().push(profile.clone());
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for FakeStore {
    async fn upsert_favorite(&self, favorite: &Favorite) -> Result<(), BackendError> {
        self.log.record(format!("upsert_favorite:{}", favorite.deal_id));
        if self.failing_deals.lock().unwrap().contains(&favorite.deal_id) {
            return Err(transient_error());
        }
        self.favorites.lock().unwrap().insert(favorite.clone());
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FakeStore {
    async fn fetch_site_settings(&self) -> Result<SiteSettings, BackendError> {
        self.log.record("fetch_site_settings");
        match *self.settings.lock().unwrap() {
            Ok(settings) => Ok(settings),
            Err(()) => Err(transient_error()),
        }
    }
}
