//! Session bootstrap orchestration.
//!
//! Runs once at application start: restores or refreshes the persisted
//! session, provisions the profile for a restored identity, lowers the
//! loading flag no matter what, and leaves behind two background tasks -
//! the auth-event listener and the one-shot site-settings fetch - each
//! with its own error boundary so their failures can never break sign-in.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::context::SessionContext;
use super::favorites::GuestFavoritesSync;
use super::ports::{AuthGateway, SettingsStore};
use super::provision::{ProfileProvisioner, ProvisionError};
use crate::backend::BackendError;
use crate::models::{AuthEvent, AuthSession, Identity};

/// Errors from the initial session restore.
///
/// Never escapes [`SessionBootstrapper::run`]; logged there so startup can
/// proceed signed out.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The current session could not be retrieved.
    #[error("session retrieval failed: {0}")]
    Session(#[from] BackendError),

    /// Provisioning failed for the restored identity.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Handles to the background tasks spawned by the bootstrapper.
///
/// The listener runs for the process lifetime; the settings fetch is
/// one-shot. Dropping the handles detaches the tasks.
pub struct BootstrapHandle {
    /// The persistent auth-event listener task.
    pub listener: JoinHandle<()>,
    /// The one-shot site-settings fetch task.
    pub settings_fetch: JoinHandle<()>,
}

/// Establishes the initial authentication state and keeps it current.
#[derive(Clone)]
pub struct SessionBootstrapper {
    auth: Arc<dyn AuthGateway>,
    settings: Arc<dyn SettingsStore>,
    provisioner: ProfileProvisioner,
    favorites: GuestFavoritesSync,
    context: SessionContext,
}

impl SessionBootstrapper {
    /// Wire a bootstrapper from its collaborators.
    #[must_use]
    pub const fn new(
        auth: Arc<dyn AuthGateway>,
        settings: Arc<dyn SettingsStore>,
        provisioner: ProfileProvisioner,
        favorites: GuestFavoritesSync,
        context: SessionContext,
    ) -> Self {
        Self {
            auth,
            settings,
            provisioner,
            favorites,
            context,
        }
    }

    /// The context this bootstrapper populates.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Run the bootstrap sequence.
    ///
    /// Never fails: every restore error is caught and logged, and the
    /// loading flag is lowered exactly once before this returns, so the UI
    /// can never observe an indefinitely-loading state. The auth-event
    /// subscription is taken before the first await, so transitions
    /// emitted during restore are buffered for the listener rather than
    /// lost.
    pub async fn run(&self) -> BootstrapHandle {
        let events = self.auth.subscribe();

        if let Err(e) = self.restore_session().await {
            tracing::error!(error = %e, "session restore failed; starting signed out");
            self.context.clear().await;
        }
        self.context.finish_loading();

        let listener = self.spawn_listener(events);
        let settings_fetch = self.spawn_settings_fetch();

        BootstrapHandle {
            listener,
            settings_fetch,
        }
    }

    /// Refresh and restore the persisted session, provisioning its profile.
    async fn restore_session(&self) -> Result<(), BootstrapError> {
        // A failed refresh is not fatal; the persisted session may still
        // carry a valid access token.
        if let Err(e) = self.auth.refresh_session().await {
            tracing::warn!(error = %e, "token refresh failed; continuing without refresh");
        }

        let Some(session) = self.auth.current_session().await? else {
            tracing::debug!("no active session; starting signed out");
            return Ok(());
        };

        tracing::info!(identity = %session.identity.id, "restored session");
        self.establish(session.identity).await?;
        Ok(())
    }

    /// Provision the identity's profile and populate the context.
    ///
    /// On provisioning failure the identity must not be left half
    /// initialized: the session is torn down locally (forced sign-out)
    /// before the error propagates.
    async fn establish(&self, identity: Identity) -> Result<(), ProvisionError> {
        match self.provisioner.ensure_profile(&identity.id).await {
            Ok(profile) => {
                self.context.begin_session(identity, profile).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    identity = %identity.id,
                    error = %e,
                    "provisioning failed; forcing local sign-out"
                );
                if let Err(sign_out_err) = self.auth.sign_out().await {
                    tracing::warn!(error = %sign_out_err, "forced sign-out failed");
                }
                self.context.clear().await;
                Err(e)
            }
        }
    }

    /// React to one sign-in (or token-refresh) event.
    ///
    /// Guest favorites migrate only after provisioning settles; a failed
    /// provisioning already forced a sign-out, so migration is skipped.
    async fn handle_sign_in(&self, session: AuthSession) {
        let investor_id = session.identity.id.clone();
        if self.establish(session.identity).await.is_err() {
            return;
        }

        match self.favorites.migrate(&investor_id).await {
            Ok(report) if report.is_noop() => {}
            Ok(report) => tracing::debug!(
                migrated = report.migrated,
                failed = report.failed,
                "guest favorites migration finished"
            ),
            Err(e) => {
                tracing::warn!(error = %e, "guest favorites migration failed; sign-in unaffected");
            }
        }
    }

    /// Spawn the persistent auth-event listener.
    fn spawn_listener(&self, mut events: broadcast::Receiver<AuthEvent>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedOut) => {
                        this.context.clear().await;
                        tracing::info!("session context cleared after sign-out");
                    }
                    Ok(AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session)) => {
                        this.handle_sign_in(session).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Spawn the one-shot site-settings fetch.
    fn spawn_settings_fetch(&self) -> JoinHandle<()> {
        let settings = Arc::clone(&self.settings);
        let context = self.context.clone();
        tokio::spawn(async move {
            match settings.fetch_site_settings().await {
                Ok(fetched) => context.set_settings(fetched).await,
                Err(e) => {
                    // Fail open: an unreachable settings row never locks
                    // visitors out.
                    tracing::warn!(error = %e, "site settings fetch failed; defaulting to open");
                    context.set_settings(crate::models::SiteSettings::default()).await;
                }
            }
        })
    }
}
