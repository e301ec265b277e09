//! Domain models for the session workflow.

pub mod profile;
pub mod session;

pub use profile::{
    Favorite, InvestorProfile, Profile, RoleProfile, SiteSettings, SyndicatorProfile,
};
pub use session::{AuthEvent, AuthSession, Identity, IdentityMetadata};
