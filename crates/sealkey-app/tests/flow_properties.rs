//! Property-based tests for the setup/unlock state machine.
//!
//! Tests verify that invariants hold under arbitrary event sequences, not
//! just the happy paths the driver exercises.

use proptest::prelude::*;
use sealkey_app::{FlowAction, FlowEvent, LockState, SetupFlow, SetupPhase};

fn event_strategy() -> impl Strategy<Value = FlowEvent> {
    prop_oneof![
        Just(FlowEvent::StartSetup),
        Just(FlowEvent::RegistrationCompleted),
        Just(FlowEvent::ResumeWithCredentials),
        Just(FlowEvent::StartSignIn),
        Just(FlowEvent::AuthenticationSucceeded),
        Just(FlowEvent::KeyCached),
        Just(FlowEvent::CeremonyFailed),
        Just(FlowEvent::Lock),
    ]
}

proptest! {
    /// Unlocked implies the flow went through a successful authentication
    /// ceremony: `KeyCached` is only accepted in `Deriving`, which is only
    /// reachable through `AuthenticationSucceeded` in `SigningIn`.
    #[test]
    fn prop_unlocked_only_after_authentication(
        events in prop::collection::vec(event_strategy(), 0..64)
    ) {
        let mut flow = SetupFlow::new();
        let mut saw_auth_success = false;

        for event in events {
            let phase_before = flow.phase();
            if let Ok(actions) = flow.handle(event) {
                if phase_before == SetupPhase::SigningIn
                    && event == FlowEvent::AuthenticationSucceeded
                {
                    prop_assert_eq!(actions, vec![FlowAction::DeriveAndCacheKey]);
                    saw_auth_success = true;
                }
            }
            if flow.lock_state() == LockState::Unlocked {
                prop_assert!(saw_auth_success);
                prop_assert_eq!(flow.phase(), SetupPhase::Complete);
            }
        }
    }

    /// Rejected events never change observable state.
    #[test]
    fn prop_rejections_leave_state_unchanged(
        events in prop::collection::vec(event_strategy(), 0..64)
    ) {
        let mut flow = SetupFlow::new();

        for event in events {
            let phase = flow.phase();
            let lock_state = flow.lock_state();
            if flow.handle(event).is_err() {
                prop_assert_eq!(flow.phase(), phase);
                prop_assert_eq!(flow.lock_state(), lock_state);
            }
        }
    }

    /// Registration completion always couples directly into signing in;
    /// there is no accepted sequence that parks a freshly registered
    /// credential in an idle phase.
    #[test]
    fn prop_registration_couples_into_sign_in(
        events in prop::collection::vec(event_strategy(), 0..64)
    ) {
        let mut flow = SetupFlow::new();

        for event in events {
            if let Ok(actions) = flow.handle(event) {
                if event == FlowEvent::RegistrationCompleted {
                    prop_assert_eq!(flow.phase(), SetupPhase::SigningIn);
                    prop_assert_eq!(actions, vec![FlowAction::BeginAuthentication]);
                }
            }
        }
    }

    /// The lock state only flips on the two events that manage the key.
    #[test]
    fn prop_lock_state_changes_only_on_key_events(
        events in prop::collection::vec(event_strategy(), 0..64)
    ) {
        let mut flow = SetupFlow::new();

        for event in events {
            let before = flow.lock_state();
            let accepted = flow.handle(event).is_ok();
            if flow.lock_state() != before {
                prop_assert!(accepted);
                prop_assert!(
                    event == FlowEvent::KeyCached || event == FlowEvent::Lock,
                    "lock state changed on {:?}", event
                );
            }
        }
    }
}
