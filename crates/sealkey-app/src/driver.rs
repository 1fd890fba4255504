//! Ceremony driver.
//!
//! [`SetupDriver`] executes the actions the [`SetupFlow`] state machine
//! emits: it runs ceremonies against the [`Authenticator`], feeds outcomes
//! back into the machine as events, derives the master key, and manages the
//! session cache. All failure paths report back into the machine so the
//! phase is always consistent with what actually happened.

use sealkey_core::{
    AuthenticationOutcome, CeremonyCoordinator, CeremonyError, CredentialRecord, Environment,
    HandoffLink, IdentityError, IdentityProvider, Storage, UserId,
};
use sealkey_crypto::{KdfVersion, MasterKey, derive_master_key};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    Authenticator, FlowError, FlowEvent, LockState, SessionKeyCache, SetupFlow, SetupPhase,
};

/// Driver-level failures.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A ceremony failed; the flow has already been moved to the
    /// appropriate recovery phase.
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),

    /// The requested operation is invalid in the current flow phase.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The identity collaborator failed at a point where setup cannot
    /// proceed without it.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Fresh setup requires a signed-in platform session.
    #[error("no signed-in user")]
    NotSignedIn,

    /// The email has no registered credentials to sign in with.
    #[error("no credentials registered for this account")]
    NoCredentials,
}

impl DriverError {
    /// True when the same operation may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ceremony(err) if err.is_retryable())
    }
}

/// Runs setup and unlock flows end to end.
pub struct SetupDriver<E: Environment, S: Storage, A, I> {
    coordinator: CeremonyCoordinator<E, S>,
    authenticator: A,
    identity: I,
    flow: SetupFlow,
    cache: SessionKeyCache,
}

impl<E, S, A, I> SetupDriver<E, S, A, I>
where
    E: Environment,
    S: Storage,
    A: Authenticator,
    I: IdentityProvider,
{
    /// Create a driver in the initial, locked state.
    pub fn new(coordinator: CeremonyCoordinator<E, S>, authenticator: A, identity: I) -> Self {
        Self {
            coordinator,
            authenticator,
            identity,
            flow: SetupFlow::new(),
            cache: SessionKeyCache::new(),
        }
    }

    /// Current flow phase.
    pub fn phase(&self) -> SetupPhase {
        self.flow.phase()
    }

    /// Current lock state.
    pub fn lock_state(&self) -> LockState {
        self.flow.lock_state()
    }

    /// True while a master key is cached.
    pub fn is_unlocked(&self) -> bool {
        self.cache.is_unlocked()
    }

    /// Borrow the cached master key for an encryption operation.
    pub fn master_key(&self) -> Option<&MasterKey> {
        self.cache.key()
    }

    /// The coordinator, for management surfaces sharing this driver.
    pub fn coordinator(&self) -> &CeremonyCoordinator<E, S> {
        &self.coordinator
    }

    /// Mark an existing-credential client as ready to sign in.
    pub fn resume_with_credentials(&mut self) -> Result<(), DriverError> {
        self.flow.handle(FlowEvent::ResumeWithCredentials)?;
        Ok(())
    }

    /// Run a complete fresh setup: register a credential, then immediately
    /// authenticate with it, derive the master key, and cache it.
    ///
    /// Returns the session handoff link if the identity collaborator
    /// produced one. A handoff failure after a successful ceremony is
    /// logged and swallowed; the derived key is already cached and retrying
    /// login is the platform's concern.
    pub async fn run_setup(&mut self) -> Result<Option<HandoffLink>, DriverError> {
        let account = self.identity.current_user().await.ok_or(DriverError::NotSignedIn)?;

        self.flow.handle(FlowEvent::StartSetup)?;
        let credential = match self.register(&account.user_id, &account.email).await {
            Ok(credential) => credential,
            Err(err) => return Err(self.ceremony_failed(err)),
        };
        self.flow.handle(FlowEvent::RegistrationCompleted)?;

        let outcome = match self.authenticate(&[credential]).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.ceremony_failed(err)),
        };

        self.finish_unlock(outcome)?;
        Ok(self.handoff(&account.user_id).await)
    }

    /// Run an unlock for a returning user identified by email.
    ///
    /// Authenticates against the user's registered credentials, derives the
    /// master key, and caches it.
    pub async fn run_unlock(&mut self, email: &str) -> Result<Option<HandoffLink>, DriverError> {
        let user_id = self
            .identity
            .user_id_for_email(email)
            .await?
            .ok_or(DriverError::NoCredentials)?;
        let credentials = self
            .coordinator
            .list_credentials(&user_id)
            .map_err(DriverError::Ceremony)?;
        if credentials.is_empty() {
            return Err(DriverError::NoCredentials);
        }

        // Credentials are confirmed to exist, so a flow still in the
        // initial phase can move to sign-in readiness on its own.
        if self.flow.phase() == SetupPhase::Initial {
            self.flow.handle(FlowEvent::ResumeWithCredentials)?;
        }
        self.flow.handle(FlowEvent::StartSignIn)?;
        let outcome = match self.authenticate(&credentials).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.ceremony_failed(err)),
        };

        self.finish_unlock(outcome)?;
        Ok(self.handoff(&user_id).await)
    }

    /// Lock the session: drop the cached key and return to sign-in
    /// readiness.
    pub fn lock(&mut self) -> Result<(), DriverError> {
        self.flow.handle(FlowEvent::Lock)?;
        self.cache.lock();
        Ok(())
    }

    async fn register(
        &self,
        user_id: &UserId,
        email: &str,
    ) -> Result<CredentialRecord, CeremonyError> {
        let (challenge_ref, options) =
            self.coordinator.begin_registration(user_id, email, email);

        let response = match self.authenticator.create_credential(&options).await {
            Ok(response) => response,
            Err(err) => {
                self.coordinator.abandon_ceremony(challenge_ref);
                return Err(err);
            },
        };

        self.coordinator.complete_registration(&response, challenge_ref)
    }

    async fn authenticate(
        &self,
        credentials: &[CredentialRecord],
    ) -> Result<AuthenticationOutcome, CeremonyError> {
        let allowed: Vec<_> =
            credentials.iter().map(|record| record.credential_id.clone()).collect();
        let (challenge_ref, options) = self.coordinator.begin_authentication(&allowed)?;

        let response = match self.authenticator.get_credential(&options).await {
            Ok(response) => response,
            Err(err) => {
                self.coordinator.abandon_ceremony(challenge_ref);
                return Err(err);
            },
        };

        self.coordinator.complete_authentication(&response, challenge_ref)
    }

    /// Derive the key from a verified assertion outcome and cache it.
    fn finish_unlock(&mut self, outcome: AuthenticationOutcome) -> Result<(), DriverError> {
        self.flow.handle(FlowEvent::AuthenticationSucceeded)?;

        let key = match self.derive_key(outcome) {
            Ok(key) => key,
            Err(err) => return Err(self.ceremony_failed(err)),
        };

        self.cache.store(key);
        self.flow.handle(FlowEvent::KeyCached)?;
        debug!("session unlocked");
        Ok(())
    }

    fn derive_key(&self, outcome: AuthenticationOutcome) -> Result<MasterKey, CeremonyError> {
        let prf_output = outcome.prf_output.ok_or(CeremonyError::PrfUnsupported)?;
        let params = outcome.prf_params.ok_or_else(|| CeremonyError::VerificationFailed {
            detail: "credential has no stored derivation parameters".to_string(),
        })?;
        let version = KdfVersion::from_tag(params.kdf_version)?;
        Ok(derive_master_key(&prf_output, &params.prf_salt, version))
    }

    /// Report a ceremony failure into the state machine, then surface it.
    fn ceremony_failed(&mut self, err: CeremonyError) -> DriverError {
        if let Err(flow_err) = self.flow.handle(FlowEvent::CeremonyFailed) {
            warn!(%flow_err, "flow rejected ceremony-failed event");
        }
        DriverError::Ceremony(err)
    }

    async fn handoff(&self, user_id: &UserId) -> Option<HandoffLink> {
        match self.identity.login_handoff(user_id).await {
            Ok(link) => Some(link),
            Err(err) => {
                // The key is cached and the ceremony already succeeded;
                // session establishment can be retried by the platform.
                warn!(%err, "login handoff failed after successful ceremony");
                None
            },
        }
    }
}
