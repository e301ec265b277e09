//! Marketplace role discriminator.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown role string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown role: {0}")]
pub struct RoleError(pub String);

/// The role a profile plays on the marketplace.
///
/// Every profile is either an investor browsing deals or a syndicator
/// listing them. The role determines which role-specific sub-profile
/// must exist alongside the profile.
///
/// Identities whose metadata does not specify a role default to
/// [`Role::Investor`]; that is the common self-service sign-up path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses, saves, and inquires about listed deals.
    #[default]
    Investor,
    /// Lists private real-estate investment deals.
    Syndicator,
}

impl Role {
    /// Returns the role as its wire string (`investor` | `syndicator`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Syndicator => "syndicator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "investor" => Ok(Self::Investor),
            "syndicator" => Ok(Self::Syndicator),
            other => Err(RoleError(other.to_owned())),
        }
    }
}
