//! Ceremony coordination.
//!
//! [`CeremonyCoordinator`] orchestrates the two WebAuthn ceremonies against
//! the platform authenticator API: credential creation (registration) and
//! assertion (authentication), with the PRF extension threaded through both.
//!
//! The two ceremonies are asymmetric by protocol design: registration can
//! only report that PRF is *enabled*; the PRF *output* appears exclusively
//! in assertion results. A complete setup therefore always runs
//! registration immediately followed by authentication - sequencing that
//! the client state machine enforces.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use sealkey_crypto::{KdfVersion, PrfOutput};
use tracing::{debug, warn};

use crate::{
    challenge::ChallengeStore,
    env::Environment,
    error::CeremonyError,
    identity::IdentityProvider,
    registry::CredentialRegistry,
    storage::{CredentialRecord, PrfParametersRecord, Storage},
    types::{ChallengeRef, CoordinatorConfig, CredentialId, RelyingParty, UserId},
    webauthn::{
        AuthenticationResponse, AuthenticatorAttachment, AuthenticatorSelection, CreationOptions,
        CredentialDescriptor, PrfEvalInput, PrfResult, PublicKeyUser, RegistrationResponse,
        RequestOptions, ResidentKeyRequirement, UserVerificationRequirement,
        cose::{ALG_EDDSA, ALG_ES256},
        verify::{verify_assertion, verify_registration},
    },
};

/// Registration state held between `begin` and `complete`.
///
/// The freshly generated PRF salt lives here until the credential exists to
/// persist it against.
#[derive(Debug, Clone)]
struct PendingRegistration {
    user_id: UserId,
    prf_salt: [u8; 32],
}

/// Result of a completed authentication ceremony.
#[derive(Debug)]
pub struct AuthenticationOutcome {
    /// The credential that authenticated, with counter and last-used
    /// already advanced.
    pub credential: CredentialRecord,
    /// Counter value accepted for this assertion.
    pub new_count: u32,
    /// Validated PRF output; `None` if the response carried none.
    pub prf_output: Option<PrfOutput>,
    /// Stored derivation parameters for this credential, when present.
    pub prf_params: Option<PrfParametersRecord>,
}

/// Orchestrates registration and authentication ceremonies.
///
/// Shared across sessions: clones share the challenge store, the pending
/// registration table, and the underlying registry storage.
#[derive(Debug, Clone)]
pub struct CeremonyCoordinator<E: Environment, S: Storage> {
    env: E,
    rp: RelyingParty,
    config: CoordinatorConfig,
    challenges: ChallengeStore<E>,
    registry: CredentialRegistry<S>,
    pending_registrations: Arc<Mutex<HashMap<ChallengeRef, PendingRegistration>>>,
}

impl<E: Environment, S: Storage> CeremonyCoordinator<E, S> {
    /// Create a coordinator for the given relying party.
    pub fn new(env: E, rp: RelyingParty, config: CoordinatorConfig, storage: S) -> Self {
        let challenges = ChallengeStore::new(env.clone(), config.challenge_ttl);
        Self {
            env,
            rp,
            config,
            challenges,
            registry: CredentialRegistry::new(storage),
            pending_registrations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The registry, for management surfaces that share this coordinator.
    pub fn registry(&self) -> &CredentialRegistry<S> {
        &self.registry
    }

    /// Begin a registration ceremony for a signed-in user.
    ///
    /// Generates a fresh PRF salt, issues a user-bound challenge, and
    /// returns the creation options to hand to the authenticator: user
    /// verification required, discoverable credential required, roaming
    /// (cross-platform) attachment.
    pub fn begin_registration(
        &self,
        user_id: &UserId,
        email: &str,
        display_name: &str,
    ) -> (ChallengeRef, CreationOptions) {
        let prf_salt = self.env.random_array();
        let (challenge_ref, challenge) = self.challenges.issue(Some(user_id.clone()));

        if let Ok(mut pending) = self.pending_registrations.lock() {
            pending.insert(
                challenge_ref,
                PendingRegistration { user_id: user_id.clone(), prf_salt },
            );
        }

        debug!(%user_id, %challenge_ref, "registration ceremony started");

        let options = CreationOptions {
            rp: self.rp.clone(),
            user: PublicKeyUser {
                id: user_id.as_bytes().to_vec(),
                name: email.to_string(),
                display_name: display_name.to_string(),
            },
            challenge: challenge.value,
            pub_key_cred_params: vec![ALG_EDDSA, ALG_ES256],
            timeout_ms: self.config.ceremony_timeout.as_millis() as u64,
            authenticator_selection: AuthenticatorSelection {
                attachment: AuthenticatorAttachment::CrossPlatform,
                resident_key: ResidentKeyRequirement::Required,
                user_verification: UserVerificationRequirement::Required,
            },
            prf_eval: PrfEvalInput { first: prf_salt },
        };

        (challenge_ref, options)
    }

    /// Complete a registration ceremony.
    ///
    /// Consumes the challenge, verifies the response, requires the PRF
    /// *enabled* acknowledgement, and persists the credential together with
    /// its PRF parameters. Registration never yields PRF output; a response
    /// carrying output here is malformed and rejected.
    pub fn complete_registration(
        &self,
        response: &RegistrationResponse,
        challenge_ref: ChallengeRef,
    ) -> Result<CredentialRecord, CeremonyError> {
        let pending = self
            .pending_registrations
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&challenge_ref))
            .ok_or(CeremonyError::ChallengeNotFound)?;

        let challenge = self.consume_from_client_data(
            challenge_ref,
            &response.client_data_json,
            Some(&pending.user_id),
        )?;

        match &response.prf {
            PrfResult::Enabled => {},
            PrfResult::Unsupported => {
                debug!(user_id = %pending.user_id, "authenticator lacks PRF support");
                return Err(CeremonyError::PrfUnsupported);
            },
            PrfResult::EnabledWithOutput(_) => {
                return Err(CeremonyError::verification("unexpected PRF output at registration"));
            },
        }

        let output = verify_registration(response, &self.rp, &challenge.value)?;

        let now_ms = self.env.unix_millis();
        let credential = CredentialRecord {
            user_id: pending.user_id.clone(),
            credential_id: response.credential_id.clone(),
            public_key_cose: output.public_key_cose,
            sign_count: output.sign_count,
            transports: response.transports.clone(),
            device_class: output.device_class,
            backed_up: output.backed_up,
            created_at_ms: now_ms,
            last_used_at_ms: now_ms,
        };
        let params = PrfParametersRecord {
            user_id: pending.user_id,
            credential_id: response.credential_id.clone(),
            prf_salt: pending.prf_salt,
            kdf_version: KdfVersion::CURRENT.tag(),
        };

        self.registry.persist_registration(&credential, &params)?;
        Ok(credential)
    }

    /// Begin an authentication ceremony against known credentials.
    ///
    /// The challenge is unbound - for an empty `allowed` list the identity
    /// is not known until the authenticator presents a discoverable
    /// credential. PRF evaluation inputs come from stored parameters, per
    /// credential.
    pub fn begin_authentication(
        &self,
        allowed: &[CredentialId],
    ) -> Result<(ChallengeRef, RequestOptions), CeremonyError> {
        let mut descriptors = Vec::with_capacity(allowed.len());
        let mut prf_eval_by_credential = Vec::with_capacity(allowed.len());
        for credential_id in allowed {
            let transports = self
                .registry
                .credential(credential_id)?
                .map(|record| record.transports)
                .unwrap_or_default();
            descriptors.push(CredentialDescriptor { id: credential_id.clone(), transports });

            if let Some(params) = self.registry.prf_params(credential_id)? {
                prf_eval_by_credential
                    .push((credential_id.clone(), PrfEvalInput { first: params.prf_salt }));
            }
        }

        Ok(self.issue_authentication(descriptors, None, prf_eval_by_credential))
    }

    /// Begin a discoverable-flow authentication ceremony.
    ///
    /// With no identity known server-side, the PRF salt cannot be looked
    /// up; the client supplies the salt it stored during setup (the
    /// parameters are not secret).
    pub fn begin_authentication_with_salt(
        &self,
        prf_salt: [u8; 32],
    ) -> (ChallengeRef, RequestOptions) {
        self.issue_authentication(Vec::new(), Some(PrfEvalInput { first: prf_salt }), Vec::new())
    }

    fn issue_authentication(
        &self,
        allow_credentials: Vec<CredentialDescriptor>,
        prf_eval: Option<PrfEvalInput>,
        prf_eval_by_credential: Vec<(CredentialId, PrfEvalInput)>,
    ) -> (ChallengeRef, RequestOptions) {
        let (challenge_ref, challenge) = self.challenges.issue(None);
        debug!(%challenge_ref, credentials = allow_credentials.len(), "authentication ceremony started");

        let options = RequestOptions {
            rp_id: self.rp.id.clone(),
            challenge: challenge.value,
            allow_credentials,
            user_verification: UserVerificationRequirement::Required,
            timeout_ms: self.config.ceremony_timeout.as_millis() as u64,
            prf_eval,
            prf_eval_by_credential,
        };
        (challenge_ref, options)
    }

    /// Complete an authentication ceremony.
    ///
    /// Consumes the challenge, resolves the credential, verifies the
    /// assertion signature, atomically advances the signature counter
    /// (strictly increasing - a regression aborts as a security signal),
    /// and extracts the validated PRF output.
    pub fn complete_authentication(
        &self,
        response: &AuthenticationResponse,
        challenge_ref: ChallengeRef,
    ) -> Result<AuthenticationOutcome, CeremonyError> {
        let challenge =
            self.consume_from_client_data(challenge_ref, &response.client_data_json, None)?;

        let credential = self
            .registry
            .credential(&response.credential_id)?
            .ok_or_else(|| CeremonyError::verification("unknown credential"))?;

        // A discoverable credential reports which user it belongs to; if it
        // does, it must agree with our records.
        if let Some(claimed) = response.claimed_user() {
            if claimed != credential.user_id {
                return Err(CeremonyError::verification("user handle mismatch"));
            }
        }

        let assertion =
            verify_assertion(response, &self.rp, &challenge.value, &credential.public_key_cose)?;

        let updated = self.registry.record_authentication(
            &response.credential_id,
            assertion.sign_count,
            self.env.unix_millis(),
        )?;

        let prf_output = match &response.prf {
            PrfResult::EnabledWithOutput(bytes) => Some(PrfOutput::from_bytes(bytes)?),
            PrfResult::Enabled | PrfResult::Unsupported => None,
        };
        let prf_params = self.registry.prf_params(&response.credential_id)?;

        debug!(
            credential_id = %response.credential_id,
            sign_count = assertion.sign_count,
            "authentication ceremony completed"
        );

        Ok(AuthenticationOutcome {
            credential: updated,
            new_count: assertion.sign_count,
            prf_output,
            prf_params,
        })
    }

    /// Abandon an in-flight ceremony (user cancelled, tab closed).
    ///
    /// Discards the challenge and any pending registration state so
    /// cancellation leaves nothing consumable behind.
    pub fn abandon_ceremony(&self, challenge_ref: ChallengeRef) {
        self.challenges.abandon(challenge_ref);
        if let Ok(mut pending) = self.pending_registrations.lock() {
            pending.remove(&challenge_ref);
        }
        debug!(%challenge_ref, "ceremony abandoned");
    }

    /// Sweep expired challenges and their pending registration state.
    pub fn purge_expired(&self) -> usize {
        let swept = self.challenges.purge_expired();
        if let Ok(mut pending) = self.pending_registrations.lock() {
            pending.retain(|challenge_ref, _| self.challenges.contains(*challenge_ref));
        }
        swept
    }

    /// Best-effort pre-flight probe: does this email have credentials?
    ///
    /// Fails soft to `false` - internal lookup errors must not leak to the
    /// sign-in page, and an attacker probing emails learns nothing from
    /// error shapes.
    pub async fn has_credentials<I: IdentityProvider>(&self, identity: &I, email: &str) -> bool {
        let user_id = match identity.user_id_for_email(email).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return false,
            Err(err) => {
                warn!(%err, "identity lookup failed during credential probe");
                return false;
            },
        };
        match self.registry.user_has_credentials(&user_id) {
            Ok(has) => has,
            Err(err) => {
                warn!(%err, "storage failed during credential probe");
                false
            },
        }
    }

    /// All credentials registered for a user, for the management UI.
    pub fn list_credentials(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CredentialRecord>, CeremonyError> {
        self.registry.list_credentials(user_id)
    }

    /// Revoke a credential and its PRF parameters.
    pub fn revoke_credential(
        &self,
        user_id: &UserId,
        credential_id: &CredentialId,
    ) -> Result<(), CeremonyError> {
        self.registry.revoke_credential(user_id, credential_id)
    }

    /// Consume the issued challenge using the value echoed in
    /// clientDataJSON.
    ///
    /// A response whose clientDataJSON does not even parse spends the
    /// challenge with a value that cannot match, which reports as
    /// `ChallengeNotFound` - malformed input is never a parse exception.
    fn consume_from_client_data(
        &self,
        challenge_ref: ChallengeRef,
        client_data_json: &[u8],
        caller: Option<&UserId>,
    ) -> Result<crate::challenge::Challenge, CeremonyError> {
        let presented = serde_json::from_slice::<crate::webauthn::client_data::CollectedClientData>(
            client_data_json,
        )
        .ok()
        .and_then(|client_data| {
            use base64::Engine as _;
            base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(client_data.challenge.as_bytes())
                .ok()
        })
        .unwrap_or_default();

        self.challenges.consume(challenge_ref, &presented, caller)
    }
}
