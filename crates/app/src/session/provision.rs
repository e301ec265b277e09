//! Lazy profile provisioning.
//!
//! Social sign-ins arrive with no marketplace profile. Rather than bounce
//! the user through a "finish your signup" step, the provisioner creates a
//! default profile (and its role sub-profile) the first time an identity is
//! seen, keeping the common existing-profile path a single read.

use std::sync::Arc;

use thiserror::Error;

use dealgrid_core::IdentityId;

use super::ports::{AuthGateway, ProfileStore};
use super::retry::RetryPolicy;
use crate::backend::BackendError;
use crate::models::{Profile, RoleProfile};

/// Errors from profile provisioning.
///
/// Every variant leaves the identity/profile invariant unknown, so the
/// caller must respond with a full local sign-out.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The profile lookup failed even after retrying transient errors.
    #[error("profile lookup failed after {attempts} attempt(s): {source}")]
    Lookup {
        /// Total lookup attempts made.
        attempts: u32,
        /// The final lookup error.
        source: BackendError,
    },

    /// The auth service no longer knows the identity.
    #[error("identity {0} not found at the auth service")]
    IdentityMissing(IdentityId),

    /// The identity record could not be fetched.
    #[error("identity fetch failed: {0}")]
    IdentityFetch(#[source] BackendError),

    /// The new profile row could not be inserted.
    #[error("profile insert failed: {0}")]
    ProfileInsert(#[source] BackendError),
}

/// Guarantees every authenticated identity has exactly one profile and one
/// matching role sub-profile.
#[derive(Clone)]
pub struct ProfileProvisioner {
    auth: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfileStore>,
    retry: RetryPolicy,
}

impl ProfileProvisioner {
    /// Create a provisioner with the default retry policy.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthGateway>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self::with_retry(auth, profiles, RetryPolicy::default())
    }

    /// Create a provisioner with an explicit retry policy.
    #[must_use]
    pub const fn with_retry(
        auth: Arc<dyn AuthGateway>,
        profiles: Arc<dyn ProfileStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            auth,
            profiles,
            retry,
        }
    }

    /// Ensure a profile exists for the identity, creating one on first
    /// encounter.
    ///
    /// An existing profile is returned as-is; no sub-profile repair is
    /// attempted. For a first-seen identity the profile insert is fatal on
    /// failure, while the role sub-profile insert is best-effort: a missing
    /// sub-profile must not block sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the lookup exhausts its retries, the
    /// identity record cannot be fetched, or the profile insert fails. The
    /// caller must treat any error as grounds for a forced local sign-out.
    pub async fn ensure_profile(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Profile, ProvisionError> {
        if let Some(existing) = self.find_with_retry(identity_id).await? {
            tracing::debug!(identity = %identity_id, "profile already provisioned");
            return Ok(existing);
        }

        let identity = self
            .auth
            .fetch_identity(identity_id)
            .await
            .map_err(ProvisionError::IdentityFetch)?
            .ok_or_else(|| ProvisionError::IdentityMissing(identity_id.clone()))?;

        let profile = Profile::for_identity(&identity);
        self.profiles
            .insert_profile(&profile)
            .await
            .map_err(ProvisionError::ProfileInsert)?;

        tracing::info!(
            identity = %identity_id,
            role = %profile.role,
            "provisioned new profile"
        );

        let role_profile = RoleProfile::empty_for(profile.role, identity_id.clone());
        if let Err(e) = self.profiles.insert_role_profile(&role_profile).await {
            tracing::warn!(
                identity = %identity_id,
                role = %profile.role,
                error = %e,
                "role sub-profile insert failed; profile remains usable"
            );
        }

        Ok(profile)
    }

    /// Profile lookup with bounded linear-backoff retries on transient
    /// errors. Non-transient errors and retry exhaustion propagate.
    async fn find_with_retry(
        &self,
        identity_id: &IdentityId,
    ) -> Result<Option<Profile>, ProvisionError> {
        let mut attempt: u32 = 0;
        loop {
            match self.profiles.find_profile(identity_id).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        identity = %identity_id,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient profile lookup failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ProvisionError::Lookup {
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }
}
