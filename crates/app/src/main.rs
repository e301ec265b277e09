//! `DealGrid` application shell.
//!
//! This binary boots the client runtime for the real-estate syndication
//! marketplace: it restores the persisted session, provisions profiles on
//! sign-in, migrates guest favorites, and keeps the shared session context
//! current until shutdown.
//!
//! # Architecture
//!
//! - Hosted backend rows (profiles, favorites, site settings) over a REST
//!   row API
//! - Hosted auth service for password sign-in and token refresh
//! - On-device file cache for the persisted session and guest favorites

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use dealgrid_app::backend::stores::{
    BackendFavoriteStore, BackendProfileStore, BackendSettingsStore,
};
use dealgrid_app::session::ports::{AuthGateway, GuestCache};
use dealgrid_app::{
    AppConfig, AuthClient, BackendClient, FileCache, GuestFavoritesSync, ProfileProvisioner,
    SessionBootstrapper, SessionContext,
};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dealgrid_app=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // On-device cache for the persisted session and guest favorites
    let cache: Arc<dyn GuestCache> =
        Arc::new(FileCache::new(&config.cache_dir).expect("Failed to open cache directory"));
    tracing::info!(dir = %config.cache_dir.display(), "device cache ready");

    // Backend clients
    let rows = BackendClient::new(&config.backend);
    let auth: Arc<dyn AuthGateway> = Arc::new(AuthClient::new(
        &config.backend,
        Arc::clone(&cache),
        rows.clone(),
    ));

    let profiles = Arc::new(BackendProfileStore::new(rows.clone()));
    let favorites = Arc::new(BackendFavoriteStore::new(rows.clone()));
    let settings = Arc::new(BackendSettingsStore::new(rows));

    // Session workflow
    let context = SessionContext::new();
    let provisioner = ProfileProvisioner::new(Arc::clone(&auth), profiles);
    let favorites_sync = GuestFavoritesSync::new(Arc::clone(&cache), favorites);

    let bootstrapper = SessionBootstrapper::new(
        auth,
        settings,
        provisioner,
        favorites_sync,
        context,
    );

    let handle = bootstrapper.run().await;
    tracing::info!(
        signed_in = bootstrapper.context().identity().await.is_some(),
        "session bootstrap complete"
    );

    shutdown_signal().await;

    handle.settings_fetch.abort();
    handle.listener.abort();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
