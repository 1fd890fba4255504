//! End-to-end setup and unlock flows through the driver.

#![allow(clippy::unwrap_used)]

use sealkey_app::{DriverError, LockState, SetupPhase};
use sealkey_core::CeremonyError;
use sealkey_harness::TestWorld;

#[tokio::test]
async fn fresh_setup_unlocks_the_session() {
    let world = TestWorld::new(1);
    world.sign_in("alice");
    let mut driver = world.driver();

    let handoff = driver.run_setup().await.unwrap();

    assert!(handoff.is_some());
    assert_eq!(driver.phase(), SetupPhase::Complete);
    assert_eq!(driver.lock_state(), LockState::Unlocked);
    assert!(driver.master_key().is_some());
}

#[tokio::test]
async fn setup_requires_a_signed_in_user() {
    let world = TestWorld::new(2);
    let mut driver = world.driver();

    assert!(matches!(driver.run_setup().await, Err(DriverError::NotSignedIn)));
    assert_eq!(driver.phase(), SetupPhase::Initial);
}

#[tokio::test]
async fn same_credential_unlocks_to_the_same_key() {
    let world = TestWorld::new(3);
    world.sign_in("alice");
    let mut driver = world.driver();

    driver.run_setup().await.unwrap();
    let first = *driver.master_key().unwrap().as_bytes();

    driver.lock().unwrap();
    assert!(!driver.is_unlocked());

    driver.run_unlock("alice@example.com").await.unwrap();
    let second = *driver.master_key().unwrap().as_bytes();

    // Same credential, same stored salt, same PRF: the key is stable
    // across sessions
    assert_eq!(first, second);
}

#[tokio::test]
async fn lock_drops_the_key_and_returns_to_ready() {
    let world = TestWorld::new(4);
    world.sign_in("alice");
    let mut driver = world.driver();
    driver.run_setup().await.unwrap();

    driver.lock().unwrap();

    assert_eq!(driver.phase(), SetupPhase::ReadyToSignIn);
    assert_eq!(driver.lock_state(), LockState::Locked);
    assert!(driver.master_key().is_none());
}

#[tokio::test]
async fn cancelled_registration_returns_to_initial_and_retry_succeeds() {
    let world = TestWorld::new(5);
    world.sign_in("alice");
    let mut driver = world.driver();

    world.authenticator.cancel_next();
    let err = driver.run_setup().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(driver.phase(), SetupPhase::Initial);
    assert!(!driver.is_unlocked());

    // Retry runs fresh ceremonies with fresh challenges
    driver.run_setup().await.unwrap();
    assert!(driver.is_unlocked());
}

#[tokio::test]
async fn cancelled_sign_in_keeps_the_credential_and_retry_succeeds() {
    let world = TestWorld::new(6);
    world.sign_in("alice");
    let mut driver = world.driver();
    driver.run_setup().await.unwrap();
    driver.lock().unwrap();

    world.authenticator.cancel_next();
    let err = driver.run_unlock("alice@example.com").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(driver.phase(), SetupPhase::ReadyToSignIn);
    assert!(!driver.is_unlocked());

    driver.run_unlock("alice@example.com").await.unwrap();
    assert!(driver.is_unlocked());
}

#[tokio::test]
async fn returning_user_on_a_new_client_unlocks() {
    let world = TestWorld::new(7);
    world.sign_in("alice");
    let mut setup_driver = world.driver();
    setup_driver.run_setup().await.unwrap();

    // A second client against the same world: fresh flow, same
    // authenticator and server state
    let mut new_client = world.driver();
    new_client.run_unlock("alice@example.com").await.unwrap();

    assert!(new_client.is_unlocked());
    assert_eq!(new_client.master_key().unwrap(), setup_driver.master_key().unwrap());
}

#[tokio::test]
async fn unknown_email_cannot_start_an_unlock() {
    let world = TestWorld::new(8);
    let mut driver = world.driver();

    let result = driver.run_unlock("stranger@example.com").await;
    assert!(matches!(result, Err(DriverError::NoCredentials)));
}

#[tokio::test]
async fn prf_incapable_authenticator_fails_setup_actionably() {
    let world = TestWorld::new(9);
    world.sign_in("alice");
    world.authenticator.set_prf_supported(false);
    let mut driver = world.driver();

    let result = driver.run_setup().await;
    assert!(matches!(result, Err(DriverError::Ceremony(CeremonyError::PrfUnsupported))));
    assert_eq!(driver.phase(), SetupPhase::Initial);
}

#[tokio::test]
async fn cloned_device_is_detected_without_disturbing_the_real_session() {
    let world = TestWorld::new(10);
    world.sign_in("alice");
    let mut driver = world.driver();
    driver.run_setup().await.unwrap();

    // Snapshot the device, then let the genuine one authenticate again so
    // its counter runs ahead of the clone's
    let cloned_device = world.authenticator.clone_device();
    driver.lock().unwrap();
    driver.run_unlock("alice@example.com").await.unwrap();

    let mut attacker = world.driver_with_device(cloned_device);
    let result = attacker.run_unlock("alice@example.com").await;

    assert!(matches!(
        result,
        Err(DriverError::Ceremony(CeremonyError::CounterRegressed { .. }))
    ));
    assert!(!attacker.is_unlocked());
    // The genuine session is untouched
    assert!(driver.is_unlocked());
}

#[tokio::test]
async fn handoff_failure_does_not_lose_the_derived_key() {
    let world = TestWorld::new(11);
    world.sign_in("alice");
    world.identity.fail_handoff(true);
    let mut driver = world.driver();

    let handoff = driver.run_setup().await.unwrap();

    assert!(handoff.is_none());
    assert!(driver.is_unlocked());
}

#[tokio::test]
async fn concurrent_setup_on_one_driver_is_rejected() {
    let world = TestWorld::new(12);
    world.sign_in("alice");
    let mut driver = world.driver();
    driver.run_setup().await.unwrap();

    // The flow is already complete; a second setup is not a valid
    // transition
    let result = driver.run_setup().await;
    assert!(matches!(result, Err(DriverError::Flow(_))));
    assert!(driver.is_unlocked());
}
