//! `DealGrid` application shell library.
//!
//! This crate provides the session workflow as a library, allowing it to
//! be tested and reused: hosted-backend clients, the on-device cache, and
//! the bootstrap / provisioning / favorites-migration machinery.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cache;
pub mod config;
pub mod models;
pub mod session;

pub use backend::{AuthClient, BackendClient, BackendError};
pub use cache::{CacheError, FileCache, MemoryCache};
pub use config::{AppConfig, BackendConfig, ConfigError};
pub use session::{
    GuestFavoritesSync, ProfileProvisioner, RetryPolicy, SessionBootstrapper, SessionContext,
};
