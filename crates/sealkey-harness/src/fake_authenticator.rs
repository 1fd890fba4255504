//! Simulated roaming authenticator.
//!
//! [`FakeAuthenticator`] is a real signer behind the [`Authenticator`]
//! trait: it mints Ed25519 credentials, builds genuine clientDataJSON,
//! attestation objects, and authenticator data, and produces assertion
//! signatures the relying-party verification accepts. Its PRF is
//! HMAC-SHA256 over a per-credential seed, matching the hmac-secret shape:
//! deterministic per (credential, salt), unrecoverable without the device.
//!
//! Failure injection covers the scenarios end-to-end tests need: denied
//! ceremonies, missing PRF support, frozen counters, and cloned devices.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signer as _, SigningKey};
use hmac::{Hmac, Mac as _};
use rand::RngCore as _;
use rand::SeedableRng as _;
use rand_chacha::ChaCha20Rng;
use sealkey_app::Authenticator;
use sealkey_core::{
    AuthenticationResponse, CeremonyError, CreationOptions, CredentialId, RegistrationResponse,
    RequestOptions, Transport,
    webauthn::{authenticator_data::flags, cose},
};
use sha2::{Digest as _, Sha256};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
struct StoredCredential {
    credential_id: Vec<u8>,
    rp_id: String,
    user_handle: Vec<u8>,
    signing_key: SigningKey,
    prf_seed: [u8; 32],
    sign_count: u32,
}

#[derive(Clone)]
struct Inner {
    rng: ChaCha20Rng,
    credentials: Vec<StoredCredential>,
    fail_next: Option<CeremonyError>,
    prf_supported: bool,
    frozen_counter: bool,
    synced: bool,
}

/// Simulated hardware key.
///
/// Clones share state (the same physical device seen from two call sites);
/// [`clone_device`](Self::clone_device) produces an independent copy with
/// identical key material, which is what a cloned credential looks like.
#[derive(Clone)]
pub struct FakeAuthenticator {
    origin: String,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for FakeAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeAuthenticator")
            .field("origin", &self.origin)
            .field("credentials", &self.credential_count())
            .finish_non_exhaustive()
    }
}

impl FakeAuthenticator {
    /// Create a device with the given RNG seed, reporting `origin` in its
    /// clientDataJSON.
    pub fn new(seed: u64, origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            inner: Arc::new(Mutex::new(Inner {
                rng: ChaCha20Rng::seed_from_u64(seed),
                credentials: Vec::new(),
                fail_next: None,
                prf_supported: true,
                frozen_counter: false,
                synced: false,
            })),
        }
    }

    /// Fail the next ceremony with the given error.
    pub fn fail_next_with(&self, err: CeremonyError) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next = Some(err);
        }
    }

    /// Fail the next ceremony as a user cancellation.
    pub fn cancel_next(&self) {
        self.fail_next_with(CeremonyError::UserCancelled);
    }

    /// Toggle PRF capability.
    pub fn set_prf_supported(&self, supported: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.prf_supported = supported;
        }
    }

    /// Stop the signature counter from advancing, as a cloned or broken
    /// authenticator would.
    pub fn freeze_counter(&self, frozen: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.frozen_counter = frozen;
        }
    }

    /// Report credentials as backup-eligible and backed up (synced
    /// passkey), instead of the single-device default.
    pub fn set_synced(&self, synced: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.synced = synced;
        }
    }

    /// An independent device carrying identical key material and counter
    /// state. Assertions from the clone and the original advance separate
    /// counters.
    pub fn clone_device(&self) -> Self {
        let inner = self
            .inner
            .lock()
            .map_or_else(
                |_| Inner {
                    rng: ChaCha20Rng::seed_from_u64(0),
                    credentials: Vec::new(),
                    fail_next: None,
                    prf_supported: true,
                    frozen_counter: false,
                    synced: false,
                },
                |inner| inner.clone(),
            );
        Self { origin: self.origin.clone(), inner: Arc::new(Mutex::new(inner)) }
    }

    /// Number of credentials stored on the device.
    pub fn credential_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.credentials.len())
    }

    fn client_data_json(&self, ceremony_type: &str, challenge: &[u8; 32]) -> Vec<u8> {
        let value = serde_json::json!({
            "type": ceremony_type,
            "challenge": URL_SAFE_NO_PAD.encode(challenge),
            "origin": self.origin,
            "crossOrigin": false,
        });
        // Serializing a json! literal cannot fail
        serde_json::to_vec(&value).unwrap_or_default()
    }
}

fn auth_data_prefix(rp_id: &str, flag_bits: u8, sign_count: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(&Sha256::digest(rp_id.as_bytes()));
    data.push(flag_bits);
    data.extend_from_slice(&sign_count.to_be_bytes());
    data
}

fn attestation_object(auth_data: Vec<u8>) -> Vec<u8> {
    use ciborium::value::Value;
    let map = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text("none".into())),
        (Value::Text("attStmt".into()), Value::Map(vec![])),
        (Value::Text("authData".into()), Value::Bytes(auth_data)),
    ]);
    let mut out = Vec::new();
    let Ok(()) = ciborium::ser::into_writer(&map, &mut out) else {
        unreachable!("CBOR serialization to a Vec cannot fail");
    };
    out
}

fn prf_evaluate(seed: &[u8; 32], salt: &[u8; 32]) -> Vec<u8> {
    let Ok(mut mac) = HmacSha256::new_from_slice(seed) else {
        unreachable!("HMAC accepts any key length");
    };
    mac.update(salt);
    mac.finalize().into_bytes().to_vec()
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn create_credential(
        &self,
        options: &CreationOptions,
    ) -> Result<RegistrationResponse, CeremonyError> {
        let mut inner = self.inner.lock().map_err(|_| CeremonyError::UserCancelled)?;
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }

        let mut credential_id = vec![0u8; 16];
        inner.rng.fill_bytes(&mut credential_id);
        let mut key_bytes = [0u8; 32];
        inner.rng.fill_bytes(&mut key_bytes);
        let signing_key = SigningKey::from_bytes(&key_bytes);
        let mut prf_seed = [0u8; 32];
        inner.rng.fill_bytes(&mut prf_seed);

        let mut flag_bits = flags::UP | flags::UV | flags::AT;
        if inner.synced {
            flag_bits |= flags::BE | flags::BS;
        }

        let mut auth_data = auth_data_prefix(&options.rp.id, flag_bits, 0);
        auth_data.extend_from_slice(&[0u8; 16]);
        auth_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&credential_id);
        auth_data.extend_from_slice(&cose::encode_ed25519(&signing_key.verifying_key()));

        let prf = if inner.prf_supported {
            sealkey_core::PrfResult::Enabled
        } else {
            sealkey_core::PrfResult::Unsupported
        };

        debug!(rp_id = %options.rp.id, "minted simulated credential");
        inner.credentials.push(StoredCredential {
            credential_id: credential_id.clone(),
            rp_id: options.rp.id.clone(),
            user_handle: options.user.id.clone(),
            signing_key,
            prf_seed,
            sign_count: 0,
        });

        Ok(RegistrationResponse {
            credential_id: CredentialId::new(credential_id),
            client_data_json: self
                .client_data_json(sealkey_core::webauthn::client_data::TYPE_CREATE, &options.challenge),
            attestation_object: attestation_object(auth_data),
            transports: vec![Transport::Usb],
            prf,
        })
    }

    async fn get_credential(
        &self,
        options: &RequestOptions,
    ) -> Result<AuthenticationResponse, CeremonyError> {
        let mut inner = self.inner.lock().map_err(|_| CeremonyError::UserCancelled)?;
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }

        let prf_supported = inner.prf_supported;
        let frozen = inner.frozen_counter;

        let index = inner
            .credentials
            .iter()
            .position(|stored| {
                if options.allow_credentials.is_empty() {
                    stored.rp_id == options.rp_id
                } else {
                    options
                        .allow_credentials
                        .iter()
                        .any(|descriptor| descriptor.id.as_bytes() == stored.credential_id)
                }
            })
            // No usable credential surfaces as a dismissed prompt
            .ok_or(CeremonyError::UserCancelled)?;

        if !frozen {
            inner.credentials[index].sign_count += 1;
        }
        let stored = inner.credentials[index].clone();
        drop(inner);

        let salt = options
            .prf_eval_by_credential
            .iter()
            .find(|(id, _)| id.as_bytes() == stored.credential_id)
            .map(|(_, input)| input.first)
            .or_else(|| options.prf_eval.map(|input| input.first));

        let prf = if !prf_supported {
            sealkey_core::PrfResult::Unsupported
        } else if let Some(salt) = salt {
            sealkey_core::PrfResult::EnabledWithOutput(prf_evaluate(&stored.prf_seed, &salt))
        } else {
            sealkey_core::PrfResult::Enabled
        };

        let auth_data =
            auth_data_prefix(&stored.rp_id, flags::UP | flags::UV, stored.sign_count);
        let client_data_json = self
            .client_data_json(sealkey_core::webauthn::client_data::TYPE_GET, &options.challenge);

        let mut message = auth_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature = stored.signing_key.sign(&message).to_bytes().to_vec();
        debug!(sign_count = stored.sign_count, "produced simulated assertion");

        Ok(AuthenticationResponse {
            credential_id: CredentialId::new(stored.credential_id),
            client_data_json,
            authenticator_data: auth_data,
            signature,
            user_handle: Some(stored.user_handle),
            prf,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealkey_core::{
        PrfEvalInput, RelyingParty, UserId,
        webauthn::{
            AuthenticatorAttachment, AuthenticatorSelection, CreationOptions, PublicKeyUser,
            ResidentKeyRequirement, UserVerificationRequirement,
            verify::{verify_assertion, verify_registration},
        },
    };

    use super::*;

    fn rp() -> RelyingParty {
        RelyingParty::new("example.com", "Example", vec!["https://app.example.com".to_string()])
    }

    fn creation_options(challenge: [u8; 32]) -> CreationOptions {
        CreationOptions {
            rp: rp(),
            user: PublicKeyUser {
                id: UserId::new("alice").as_bytes().to_vec(),
                name: "alice@example.com".to_string(),
                display_name: "Alice".to_string(),
            },
            challenge,
            pub_key_cred_params: vec![-8, -7],
            timeout_ms: 120_000,
            authenticator_selection: AuthenticatorSelection {
                attachment: AuthenticatorAttachment::CrossPlatform,
                resident_key: ResidentKeyRequirement::Required,
                user_verification: UserVerificationRequirement::Required,
            },
            prf_eval: PrfEvalInput { first: [0x11; 32] },
        }
    }

    fn request_options(challenge: [u8; 32], salt: [u8; 32]) -> RequestOptions {
        RequestOptions {
            rp_id: "example.com".to_string(),
            challenge,
            allow_credentials: vec![],
            user_verification: UserVerificationRequirement::Required,
            timeout_ms: 120_000,
            prf_eval: Some(PrfEvalInput { first: salt }),
            prf_eval_by_credential: vec![],
        }
    }

    #[tokio::test]
    async fn minted_credential_passes_relying_party_verification() {
        let device = FakeAuthenticator::new(1, "https://app.example.com");
        let challenge = [0xAB; 32];

        let response = device.create_credential(&creation_options(challenge)).await.unwrap();
        let output = verify_registration(&response, &rp(), &challenge).unwrap();

        assert_eq!(output.sign_count, 0);
        assert_eq!(device.credential_count(), 1);
    }

    #[tokio::test]
    async fn assertion_passes_verification_and_prf_is_deterministic() {
        let device = FakeAuthenticator::new(2, "https://app.example.com");
        let reg = device.create_credential(&creation_options([0x01; 32])).await.unwrap();
        let output = verify_registration(&reg, &rp(), &[0x01; 32]).unwrap();

        let salt = [0x22; 32];
        let first = device.get_credential(&request_options([0x02; 32], salt)).await.unwrap();
        verify_assertion(&first, &rp(), &[0x02; 32], &output.public_key_cose).unwrap();

        let second = device.get_credential(&request_options([0x03; 32], salt)).await.unwrap();

        // Same credential, same salt: the PRF output is stable across
        // ceremonies even though everything else differs
        assert_eq!(first.prf, second.prf);
        assert_ne!(first.signature, second.signature);
    }

    #[tokio::test]
    async fn injected_failure_consumes_itself() {
        let device = FakeAuthenticator::new(3, "https://app.example.com");
        device.cancel_next();

        let denied = device.create_credential(&creation_options([0x05; 32])).await;
        assert!(matches!(denied, Err(CeremonyError::UserCancelled)));

        let retried = device.create_credential(&creation_options([0x06; 32])).await;
        assert!(retried.is_ok());
    }
}
