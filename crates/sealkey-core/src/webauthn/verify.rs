//! Registration and assertion verification.

use ciborium::value::Value;
use sha2::{Digest, Sha256};

use crate::{
    error::CeremonyError,
    types::{DeviceClass, RelyingParty},
    webauthn::{
        RegistrationResponse,
        authenticator_data::{AuthenticatorData, flags},
        client_data::{TYPE_CREATE, TYPE_GET, verify_client_data},
        cose::CosePublicKey,
    },
};

/// Attestation formats this subsystem accepts.
///
/// Attestation statements are not chained to vendor roots: the trust anchor
/// here is the PRF-capable credential itself, not the authenticator make.
/// `none` is what privacy-preserving browsers send; `packed` self-attestation
/// is what roaming keys produce when attestation is requested anyway.
const ACCEPTED_ATTESTATION_FORMATS: [&str; 2] = ["none", "packed"];

/// Outcome of a verified registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutput {
    /// Raw COSE public key bytes to persist as verifier material.
    pub public_key_cose: Vec<u8>,
    /// Counter value reported at creation.
    pub sign_count: u32,
    /// Single-device or synced, from the backup-eligibility flag.
    pub device_class: DeviceClass,
    /// Whether the credential is currently backed up.
    pub backed_up: bool,
}

/// Outcome of a verified assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionOutput {
    /// Counter value the authenticator reported for this assertion.
    pub sign_count: u32,
}

/// Verify a credential-creation response.
///
/// Checks clientDataJSON (type/challenge/origin), unpacks the attestation
/// object, and validates the authenticator data: relying-party hash, user
/// presence and verification, attested credential data matching the
/// response's credential id, and a COSE key with a supported algorithm.
pub fn verify_registration(
    response: &RegistrationResponse,
    rp: &RelyingParty,
    expected_challenge: &[u8; 32],
) -> Result<RegistrationOutput, CeremonyError> {
    verify_client_data(&response.client_data_json, TYPE_CREATE, expected_challenge, &rp.origins)?;

    let auth_data_bytes = unpack_attestation_object(&response.attestation_object)?;
    let auth_data = AuthenticatorData::parse(&auth_data_bytes)?;

    check_rp_id_hash(&auth_data, rp)?;
    check_user_presence_and_verification(&auth_data)?;

    let attested = auth_data
        .attested
        .as_ref()
        .ok_or_else(|| CeremonyError::verification("registration without attested data"))?;
    if attested.credential_id != response.credential_id.as_bytes() {
        return Err(CeremonyError::verification("credential id mismatch"));
    }

    // Parse now so an unsupported key never gets persisted
    CosePublicKey::parse(&attested.public_key_cose)?;

    let device_class = if auth_data.has_flags(flags::BE) {
        DeviceClass::MultiDevice
    } else {
        DeviceClass::SingleDevice
    };

    Ok(RegistrationOutput {
        public_key_cose: attested.public_key_cose.clone(),
        sign_count: auth_data.sign_count,
        device_class,
        backed_up: auth_data.has_flags(flags::BS),
    })
}

/// Verify an assertion response against stored verifier material.
///
/// The signature covers `authenticator_data ‖ SHA-256(clientDataJSON)`.
/// Counter semantics are NOT checked here - the strictly-increasing check is
/// an atomic storage operation owned by the registry.
pub fn verify_assertion(
    response: &crate::webauthn::AuthenticationResponse,
    rp: &RelyingParty,
    expected_challenge: &[u8; 32],
    public_key_cose: &[u8],
) -> Result<AssertionOutput, CeremonyError> {
    verify_client_data(&response.client_data_json, TYPE_GET, expected_challenge, &rp.origins)?;

    let auth_data = AuthenticatorData::parse(&response.authenticator_data)?;
    check_rp_id_hash(&auth_data, rp)?;
    check_user_presence_and_verification(&auth_data)?;

    let key = CosePublicKey::parse(public_key_cose)?;
    let client_data_hash = Sha256::digest(&response.client_data_json);
    let mut message =
        Vec::with_capacity(response.authenticator_data.len() + client_data_hash.len());
    message.extend_from_slice(&response.authenticator_data);
    message.extend_from_slice(&client_data_hash);

    key.verify(&message, &response.signature)?;

    Ok(AssertionOutput { sign_count: auth_data.sign_count })
}

/// Unpack the attestation object and return the authenticator data bytes.
fn unpack_attestation_object(raw: &[u8]) -> Result<Vec<u8>, CeremonyError> {
    let value: Value = ciborium::de::from_reader(raw)
        .map_err(|err| CeremonyError::verification(format!("attestation object CBOR: {err}")))?;
    let Value::Map(entries) = value else {
        return Err(CeremonyError::verification("attestation object is not a map"));
    };

    let mut fmt = None;
    let mut auth_data = None;
    for (key, entry) in entries {
        let Value::Text(label) = key else { continue };
        match (label.as_str(), entry) {
            ("fmt", Value::Text(value)) => fmt = Some(value),
            ("authData", Value::Bytes(bytes)) => auth_data = Some(bytes),
            _ => {},
        }
    }

    let fmt = fmt.ok_or_else(|| CeremonyError::verification("attestation object missing fmt"))?;
    if !ACCEPTED_ATTESTATION_FORMATS.contains(&fmt.as_str()) {
        return Err(CeremonyError::verification(format!("attestation format {fmt}")));
    }

    auth_data.ok_or_else(|| CeremonyError::verification("attestation object missing authData"))
}

fn check_rp_id_hash(auth_data: &AuthenticatorData, rp: &RelyingParty) -> Result<(), CeremonyError> {
    let expected = Sha256::digest(rp.id.as_bytes());
    if auth_data.rp_id_hash != expected[..] {
        return Err(CeremonyError::verification("rpIdHash mismatch"));
    }
    Ok(())
}

fn check_user_presence_and_verification(
    auth_data: &AuthenticatorData,
) -> Result<(), CeremonyError> {
    if !auth_data.has_flags(flags::UP) {
        return Err(CeremonyError::verification("user presence flag not set"));
    }
    if !auth_data.has_flags(flags::UV) {
        return Err(CeremonyError::verification("user verification flag not set"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Full happy-path coverage for these functions lives in the harness
    // end-to-end tests, which build responses the way a real authenticator
    // would. The cases here exercise the rejection paths that are awkward
    // to produce through the harness.

    fn rp() -> RelyingParty {
        RelyingParty::new(
            "example.com",
            "Example",
            vec!["https://app.example.com".to_string()],
        )
    }

    fn attestation_object(fmt: &str, auth_data: Option<Vec<u8>>) -> Vec<u8> {
        let mut entries = vec![
            (Value::Text("fmt".into()), Value::Text(fmt.into())),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
        ];
        if let Some(bytes) = auth_data {
            entries.push((Value::Text("authData".into()), Value::Bytes(bytes)));
        }
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut out).unwrap();
        out
    }

    #[test]
    fn unpack_accepts_none_format() {
        let raw = attestation_object("none", Some(vec![1, 2, 3]));
        assert_eq!(unpack_attestation_object(&raw).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unpack_rejects_unknown_format() {
        let raw = attestation_object("fido-u2f", Some(vec![1, 2, 3]));
        assert!(unpack_attestation_object(&raw).is_err());
    }

    #[test]
    fn unpack_rejects_missing_auth_data() {
        let raw = attestation_object("none", None);
        assert!(unpack_attestation_object(&raw).is_err());
    }

    #[test]
    fn rp_id_hash_mismatch_is_rejected() {
        let auth_data = AuthenticatorData {
            rp_id_hash: [0u8; 32],
            flags: flags::UP | flags::UV,
            sign_count: 0,
            attested: None,
        };
        assert!(check_rp_id_hash(&auth_data, &rp()).is_err());
    }

    #[test]
    fn missing_user_verification_is_rejected() {
        let auth_data = AuthenticatorData {
            rp_id_hash: [0u8; 32],
            flags: flags::UP,
            sign_count: 0,
            attested: None,
        };
        assert!(check_user_presence_and_verification(&auth_data).is_err());
    }
}
