//! The session workflow.
//!
//! Everything that runs between "the app started" and "the UI knows who is
//! signed in": session bootstrap, lazy profile provisioning, guest
//! favorites migration, and the pure route-guard decision.

pub mod bootstrap;
pub mod context;
pub mod favorites;
pub mod guard;
pub mod ports;
pub mod provision;
pub mod retry;

pub use bootstrap::{BootstrapError, BootstrapHandle, SessionBootstrapper};
pub use context::SessionContext;
pub use favorites::{GuestFavoritesSync, MigrationReport};
pub use guard::{PUBLIC_PATHS, requires_auth, should_prompt};
pub use provision::{ProfileProvisioner, ProvisionError};
pub use retry::RetryPolicy;
