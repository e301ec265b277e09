//! Profile, role sub-profile, favorite, and site settings rows.
//!
//! These structs are the wire shapes exchanged with the hosted backend's
//! row API. Field names match the backend columns, so they serialize
//! directly into insert/upsert bodies.

use serde::{Deserialize, Serialize};

use dealgrid_core::{DealId, Email, IdentityId, Role};

use super::session::Identity;

/// A marketplace profile, keyed 1:1 by identity.
///
/// Created lazily by the profile provisioner the first time an identity is
/// seen without a matching row. At most one profile exists per identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Identifier of the owning identity (primary key).
    pub identity_id: IdentityId,
    /// Email address copied from the identity at provisioning time.
    pub email: Email,
    /// Display name shown on listings and inquiries.
    pub display_name: String,
    /// Avatar reference from identity metadata, if any.
    pub avatar_url: Option<String>,
    /// Marketplace role; determines which sub-profile must exist.
    pub role: Role,
    /// Whether the profile is verified.
    pub verified: bool,
}

impl Profile {
    /// Synthesize the default profile for a first-seen identity.
    ///
    /// Role comes from identity metadata (`user_type`), defaulting to
    /// investor when unspecified or unrecognized. The display name falls
    /// back to the local part of the email when metadata carries no name.
    /// New profiles are pre-verified; moderation can revoke this later.
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        let role = identity
            .metadata
            .user_type
            .as_deref()
            .and_then(|s| s.parse::<Role>().ok())
            .unwrap_or_default();

        let display_name = identity
            .metadata
            .full_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| identity.email.local_part().to_owned());

        Self {
            identity_id: identity.id.clone(),
            email: identity.email.clone(),
            display_name,
            avatar_url: identity.metadata.avatar_url.clone(),
            role,
            verified: true,
        }
    }
}

/// Investor extension data, keyed by the same identity as its profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvestorProfile {
    /// Identifier of the owning identity (primary key).
    pub identity_id: IdentityId,
    /// Self-reported accreditation status.
    pub accreditation_status: Option<String>,
    /// Free-form investment preferences.
    pub investment_preferences: Vec<String>,
    /// Preferred property types (multifamily, industrial, ...).
    pub preferred_property_types: Vec<String>,
    /// Preferred markets/locations.
    pub preferred_locations: Vec<String>,
}

/// Syndicator extension data, keyed by the same identity as its profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyndicatorProfile {
    /// Identifier of the owning identity (primary key).
    pub identity_id: IdentityId,
    /// Company or sponsor name.
    pub company_name: Option<String>,
    /// References to uploaded verification documents.
    pub verification_documents: Vec<String>,
}

/// One of the two role-specific sub-profile shapes.
///
/// Exactly one sub-profile, of the type matching `Profile.role`, must exist
/// for every profile. It is created in the same provisioning step as the
/// profile, best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleProfile {
    /// Investor extension row.
    Investor(InvestorProfile),
    /// Syndicator extension row.
    Syndicator(SyndicatorProfile),
}

impl RoleProfile {
    /// Build the empty-defaults sub-profile matching a role.
    #[must_use]
    pub fn empty_for(role: Role, identity_id: IdentityId) -> Self {
        match role {
            Role::Investor => Self::Investor(InvestorProfile {
                identity_id,
                accreditation_status: None,
                investment_preferences: Vec::new(),
                preferred_property_types: Vec::new(),
                preferred_locations: Vec::new(),
            }),
            Role::Syndicator => Self::Syndicator(SyndicatorProfile {
                identity_id,
                company_name: None,
                verification_documents: Vec::new(),
            }),
        }
    }

    /// The identity this sub-profile belongs to.
    #[must_use]
    pub const fn identity_id(&self) -> &IdentityId {
        match self {
            Self::Investor(p) => &p.identity_id,
            Self::Syndicator(p) => &p.identity_id,
        }
    }

    /// The role this sub-profile shape corresponds to.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Investor(_) => Role::Investor,
            Self::Syndicator(_) => Role::Syndicator,
        }
    }
}

/// A saved deal, unique per `(investor_id, deal_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Favorite {
    /// The investor who saved the deal.
    pub investor_id: IdentityId,
    /// The saved deal.
    pub deal_id: DealId,
}

/// Site-wide settings singleton.
///
/// Fetched once at bootstrap. A missing row deserializes to the default,
/// which leaves the site open (`require_auth = false`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SiteSettings {
    /// When true, non-public routes prompt unauthenticated visitors.
    #[serde(default)]
    pub require_auth: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::session::IdentityMetadata;

    fn identity(metadata: IdentityMetadata) -> Identity {
        Identity {
            id: IdentityId::new("id-1"),
            email: Email::parse("jordan@example.com").unwrap(),
            metadata,
        }
    }

    #[test]
    fn test_for_identity_defaults_to_investor() {
        let profile = Profile::for_identity(&identity(IdentityMetadata::default()));
        assert_eq!(profile.role, Role::Investor);
        assert!(profile.verified);
    }

    #[test]
    fn test_for_identity_reads_user_type() {
        let metadata = IdentityMetadata {
            user_type: Some("syndicator".to_owned()),
            ..IdentityMetadata::default()
        };
        let profile = Profile::for_identity(&identity(metadata));
        assert_eq!(profile.role, Role::Syndicator);
    }

    #[test]
    fn test_for_identity_unknown_user_type_falls_back() {
        let metadata = IdentityMetadata {
            user_type: Some("broker".to_owned()),
            ..IdentityMetadata::default()
        };
        let profile = Profile::for_identity(&identity(metadata));
        assert_eq!(profile.role, Role::Investor);
    }

    #[test]
    fn test_for_identity_display_name_from_metadata() {
        let metadata = IdentityMetadata {
            full_name: Some("Jordan Li".to_owned()),
            ..IdentityMetadata::default()
        };
        let profile = Profile::for_identity(&identity(metadata));
        assert_eq!(profile.display_name, "Jordan Li");
    }

    #[test]
    fn test_for_identity_display_name_falls_back_to_local_part() {
        let profile = Profile::for_identity(&identity(IdentityMetadata::default()));
        assert_eq!(profile.display_name, "jordan");

        // An empty metadata name is treated as absent.
        let metadata = IdentityMetadata {
            full_name: Some(String::new()),
            ..IdentityMetadata::default()
        };
        let profile = Profile::for_identity(&identity(metadata));
        assert_eq!(profile.display_name, "jordan");
    }

    #[test]
    fn test_role_profile_shape_matches_role() {
        let id = IdentityId::new("id-1");
        let investor = RoleProfile::empty_for(Role::Investor, id.clone());
        assert_eq!(investor.role(), Role::Investor);
        assert_eq!(investor.identity_id(), &id);

        let syndicator = RoleProfile::empty_for(Role::Syndicator, id.clone());
        assert!(matches!(syndicator, RoleProfile::Syndicator(_)));
    }

    #[test]
    fn test_empty_sub_profiles_carry_only_the_identity() {
        let id = IdentityId::new("id-1");

        let RoleProfile::Investor(investor) = RoleProfile::empty_for(Role::Investor, id.clone())
        else {
            panic!("expected investor shape");
        };
        assert_eq!(investor.identity_id, id);
        assert_eq!(investor.accreditation_status, None);
        assert!(investor.investment_preferences.is_empty());
        assert!(investor.preferred_property_types.is_empty());
        assert!(investor.preferred_locations.is_empty());

        let RoleProfile::Syndicator(syndicator) = RoleProfile::empty_for(Role::Syndicator, id.clone())
        else {
            panic!("expected syndicator shape");
        };
        assert_eq!(syndicator.identity_id, id);
        assert_eq!(syndicator.company_name, None);
        assert!(syndicator.verification_documents.is_empty());
    }

    #[test]
    fn test_site_settings_missing_field_is_open() {
        let settings: SiteSettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.require_auth);
    }
}
