//! Integration tests for lazy profile provisioning.
//!
//! Drives [`ProfileProvisioner`] directly against the in-memory fakes:
//! first-sight creation, idempotency, role fidelity, sub-profile failure
//! isolation, and the bounded retry of transient lookup failures.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use dealgrid_app::models::IdentityMetadata;
use dealgrid_app::models::Profile;
use dealgrid_app::session::provision::ProvisionError;
use dealgrid_app::{ProfileProvisioner, RetryPolicy};
use dealgrid_core::{IdentityId, Role};
use dealgrid_integration_tests::{
    FakeAuth, FakeStore, OpLog, identity, identity_with, permanent_error, transient_error,
};

fn harness() -> (Arc<FakeAuth>, Arc<FakeStore>, ProfileProvisioner, OpLog) {
    let log = OpLog::new();
    let auth = Arc::new(FakeAuth::new(log.clone()));
    let store = Arc::new(FakeStore::new(log.clone()));
    let provisioner =
        ProfileProvisioner::with_retry(auth.clone(), store.clone(), RetryPolicy::none());
    (auth, store, provisioner, log)
}

#[tokio::test]
async fn test_first_sight_creates_profile_and_sub_profile() {
    let (auth, store, provisioner, _) = harness();
    auth.register_identity(identity("user-1"));

    let profile = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap();

    assert_eq!(profile.role, Role::Investor);
    assert!(profile.verified);
    assert_eq!(profile.display_name, "user-1");

    let stored = store.profile(&IdentityId::new("user-1")).unwrap();
    assert_eq!(stored, profile);

    let sub_profiles = store.role_profiles();
    assert_eq!(sub_profiles.len(), 1);
    assert_eq!(sub_profiles[0].role(), Role::Investor);
    assert_eq!(sub_profiles[0].identity_id(), &IdentityId::new("user-1"));
}

#[tokio::test]
async fn test_syndicator_metadata_creates_syndicator_sub_profile() {
    let (auth, store, provisioner, _) = harness();
    auth.register_identity(identity_with(
        "user-s",
        IdentityMetadata {
            user_type: Some("syndicator".to_owned()),
            full_name: Some("Ava Chen".to_owned()),
            ..IdentityMetadata::default()
        },
    ));

    let profile = provisioner
        .ensure_profile(&IdentityId::new("user-s"))
        .await
        .unwrap();

    assert_eq!(profile.role, Role::Syndicator);
    assert_eq!(profile.display_name, "Ava Chen");
    assert_eq!(store.role_profiles()[0].role(), Role::Syndicator);
}

#[tokio::test]
async fn test_existing_profile_returned_without_writes() {
    let (auth, store, provisioner, log) = harness();
    let user = identity("user-1");
    auth.register_identity(user.clone());
    store.seed_profile(Profile::for_identity(&user));

    let profile = provisioner.ensure_profile(&user.id).await.unwrap();

    assert_eq!(profile.identity_id, user.id);
    assert!(log.position("insert_profile").is_none());
    assert!(log.position("insert_role_profile").is_none());
    assert!(log.position("fetch_identity").is_none());
}

#[tokio::test]
async fn test_repeated_provisioning_is_idempotent() {
    let (auth, store, provisioner, _) = harness();
    auth.register_identity(identity("user-1"));
    let id = IdentityId::new("user-1");

    let first = provisioner.ensure_profile(&id).await.unwrap();
    let second = provisioner.ensure_profile(&id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.profile_count(), 1);
    assert_eq!(store.role_profiles().len(), 1);
}

#[tokio::test]
async fn test_sub_profile_failure_does_not_block_sign_in() {
    let (auth, store, provisioner, _) = harness();
    auth.register_identity(identity("user-1"));
    store.fail_role_profile_insert();

    let profile = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap();

    // Profile provisioning succeeded even though the sub-profile insert
    // failed.
    assert_eq!(store.profile(&profile.identity_id), Some(profile));
    assert!(store.role_profiles().is_empty());
}

#[tokio::test]
async fn test_unknown_identity_is_fatal() {
    let (_auth, _store, provisioner, _) = harness();

    let err = provisioner
        .ensure_profile(&IdentityId::new("ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::IdentityMissing(id) if id == IdentityId::new("ghost")));
}

#[tokio::test]
async fn test_identity_fetch_failure_is_fatal() {
    let (auth, _store, provisioner, _) = harness();
    auth.fail_identity_fetch();

    let err = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::IdentityFetch(_)));
}

#[tokio::test]
async fn test_profile_insert_failure_is_fatal() {
    let (auth, store, provisioner, _) = harness();
    auth.register_identity(identity("user-1"));
    store.fail_profile_insert();

    let err = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::ProfileInsert(_)));
}

// =============================================================================
// Lookup retry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_transient_lookup_failures_are_retried() {
    let log = OpLog::new();
    let auth = Arc::new(FakeAuth::new(log.clone()));
    let store = Arc::new(FakeStore::new(log));
    let user = identity("user-1");
    auth.register_identity(user.clone());
    store.seed_profile(Profile::for_identity(&user));
    store.fail_next_finds([transient_error(), transient_error()]);

    let provisioner = ProfileProvisioner::new(auth, store.clone());
    let profile = provisioner.ensure_profile(&user.id).await.unwrap();

    assert_eq!(profile.identity_id, user.id);
    assert_eq!(store.find_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_retry_is_bounded() {
    let log = OpLog::new();
    let auth = Arc::new(FakeAuth::new(log.clone()));
    let store = Arc::new(FakeStore::new(log));
    store.fail_next_finds([
        transient_error(),
        transient_error(),
        transient_error(),
        transient_error(),
        transient_error(),
    ]);

    // Default policy: 3 retries, so 4 total attempts.
    let provisioner = ProfileProvisioner::new(auth, store.clone());
    let started = tokio::time::Instant::now();
    let err = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Lookup { attempts: 4, .. }));
    assert_eq!(store.find_calls(), 4);
    // Linear backoff: 1s + 2s + 3s between the four attempts.
    assert_eq!(started.elapsed(), Duration::from_secs(6));
}

#[tokio::test]
async fn test_non_transient_lookup_failure_is_not_retried() {
    let (_auth, store, provisioner, _) = harness();
    store.fail_next_finds([permanent_error()]);

    let err = provisioner
        .ensure_profile(&IdentityId::new("user-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Lookup { attempts: 1, .. }));
    assert_eq!(store.find_calls(), 1);
}
