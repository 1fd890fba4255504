//! Setup/unlock state machine.
//!
//! [`SetupFlow`] is a pure state machine: it consumes [`FlowEvent`] inputs
//! and produces [`FlowAction`] instructions for the driver to execute. No
//! I/O, no key material, fully testable without an authenticator.
//!
//! The machine encodes the two-phase coupling of a fresh setup: completing
//! registration transitions directly into signing in, never into an idle
//! state, because the PRF output needed for key derivation only exists in
//! assertion responses. There is no event sequence that reaches
//! [`SetupPhase::Complete`] without an authentication ceremony succeeding.

use thiserror::Error;

use crate::{FlowAction, FlowEvent, LockState, SetupPhase};

/// Invalid flow inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A setup or sign-in ceremony is already in flight.
    #[error("a ceremony is already in progress")]
    CeremonyInProgress,

    /// The event is meaningless in the current phase.
    #[error("event {event} not valid in phase {phase}")]
    InvalidTransition {
        /// Phase the machine was in.
        phase: SetupPhase,
        /// Name of the rejected event.
        event: &'static str,
    },
}

/// Setup/unlock state machine.
#[derive(Debug, Clone)]
pub struct SetupFlow {
    phase: SetupPhase,
    lock_state: LockState,
}

impl Default for SetupFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupFlow {
    /// Create a flow in the initial (no credential) phase.
    pub fn new() -> Self {
        Self { phase: SetupPhase::Initial, lock_state: LockState::Locked }
    }

    /// Current phase.
    pub fn phase(&self) -> SetupPhase {
        self.phase
    }

    /// Current lock state.
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// Process an event and return the actions to execute.
    ///
    /// Rejected events leave the machine unchanged.
    pub fn handle(&mut self, event: FlowEvent) -> Result<Vec<FlowAction>, FlowError> {
        match (self.phase, event) {
            (SetupPhase::Initial, FlowEvent::StartSetup) => {
                self.phase = SetupPhase::Registering;
                Ok(vec![FlowAction::BeginRegistration])
            },
            (SetupPhase::Initial, FlowEvent::ResumeWithCredentials) => {
                self.phase = SetupPhase::ReadyToSignIn;
                Ok(vec![])
            },
            // Registration success flows straight into authentication; the
            // key cannot be derived until an assertion returns PRF output.
            (SetupPhase::Registering, FlowEvent::RegistrationCompleted) => {
                self.phase = SetupPhase::SigningIn;
                Ok(vec![FlowAction::BeginAuthentication])
            },
            // A failed registration leaves no credential behind; the next
            // attempt starts over.
            (SetupPhase::Registering, FlowEvent::CeremonyFailed) => {
                self.phase = SetupPhase::Initial;
                Ok(vec![])
            },
            (SetupPhase::ReadyToSignIn, FlowEvent::StartSignIn) => {
                self.phase = SetupPhase::SigningIn;
                Ok(vec![FlowAction::BeginAuthentication])
            },
            (SetupPhase::SigningIn, FlowEvent::AuthenticationSucceeded) => {
                self.phase = SetupPhase::Deriving;
                Ok(vec![FlowAction::DeriveAndCacheKey])
            },
            // KeyCached is only meaningful after an assertion succeeded;
            // arriving here is the sole path to Unlocked.
            (SetupPhase::Deriving, FlowEvent::KeyCached) => {
                self.phase = SetupPhase::Complete;
                self.lock_state = LockState::Unlocked;
                Ok(vec![])
            },
            // The credential survived; only this attempt failed.
            (
                SetupPhase::SigningIn | SetupPhase::Deriving,
                FlowEvent::CeremonyFailed,
            ) => {
                self.phase = SetupPhase::ReadyToSignIn;
                Ok(vec![])
            },
            (SetupPhase::Complete, FlowEvent::Lock) => {
                self.phase = SetupPhase::ReadyToSignIn;
                self.lock_state = LockState::Locked;
                Ok(vec![FlowAction::ClearCachedKey])
            },
            (
                SetupPhase::Registering | SetupPhase::SigningIn | SetupPhase::Deriving,
                FlowEvent::StartSetup | FlowEvent::StartSignIn,
            ) => Err(FlowError::CeremonyInProgress),
            (phase, event) => {
                Err(FlowError::InvalidTransition { phase, event: event.name() })
            },
        }
    }
}
