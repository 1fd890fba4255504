//! clientDataJSON validation.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::error::CeremonyError;

/// Ceremony type tag for credential creation.
pub const TYPE_CREATE: &str = "webauthn.create";

/// Ceremony type tag for assertion.
pub const TYPE_GET: &str = "webauthn.get";

/// The fields of clientDataJSON this subsystem checks.
///
/// Unknown fields are ignored; browsers add advisory members freely.
#[derive(Debug, Deserialize)]
pub struct CollectedClientData {
    /// Ceremony type: `webauthn.create` or `webauthn.get`.
    #[serde(rename = "type")]
    pub ceremony_type: String,
    /// Challenge, base64url (no padding) over the issued value.
    pub challenge: String,
    /// Origin the browser observed.
    pub origin: String,
}

/// Encode a challenge value the way clientDataJSON carries it.
pub fn encode_challenge(value: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(value)
}

/// Parse and validate clientDataJSON against the issued challenge.
///
/// Checks, in order: JSON shape, ceremony type, challenge equality
/// (constant-time over the decoded bytes), and origin membership in the
/// relying party's allowed set. Any failure is a generic verification
/// failure; the detail strings stay server-side.
pub fn verify_client_data(
    raw: &[u8],
    expected_type: &str,
    expected_challenge: &[u8; 32],
    allowed_origins: &[String],
) -> Result<CollectedClientData, CeremonyError> {
    let client_data: CollectedClientData = serde_json::from_slice(raw)
        .map_err(|err| CeremonyError::verification(format!("clientDataJSON parse: {err}")))?;

    if client_data.ceremony_type != expected_type {
        return Err(CeremonyError::verification(format!(
            "ceremony type: expected {expected_type}, got {}",
            client_data.ceremony_type
        )));
    }

    let presented = URL_SAFE_NO_PAD
        .decode(client_data.challenge.as_bytes())
        .map_err(|_| CeremonyError::verification("challenge is not base64url"))?;
    if presented.len() != expected_challenge.len()
        || presented.ct_eq(expected_challenge.as_slice()).unwrap_u8() != 1
    {
        return Err(CeremonyError::verification("challenge mismatch"));
    }

    if !allowed_origins.iter().any(|origin| origin == &client_data.origin) {
        return Err(CeremonyError::verification(format!(
            "origin {} not in allowed set",
            client_data.origin
        )));
    }

    Ok(client_data)
}
