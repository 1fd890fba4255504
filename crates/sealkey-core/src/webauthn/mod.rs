//! WebAuthn boundary types and verification.
//!
//! Everything the browser/authenticator API hands back is validated here
//! before any of it reaches the registry or key derivation. The submodules
//! split along the artifact being checked:
//!
//! - [`client_data`]: the clientDataJSON contract (type, challenge, origin)
//! - [`authenticator_data`]: the packed authenticator data structure
//! - [`cose`]: COSE public keys and assertion signature verification
//! - [`verify`]: the full registration / assertion checks
//!
//! Responses carry already-decoded bytes; transporting them as base64 JSON
//! is the embedding application's concern.

pub mod authenticator_data;
pub mod client_data;
pub mod cose;
pub mod verify;

pub use authenticator_data::{AuthenticatorData, flags};
pub use cose::CosePublicKey;
pub use verify::{AssertionOutput, RegistrationOutput, verify_assertion, verify_registration};

use crate::types::{CredentialId, RelyingParty, Transport, UserId};

/// Result of the PRF extension, as reported by the client.
///
/// The loosely-typed extension output from the browser API is narrowed into
/// this tagged form at the boundary. Registration can at most report
/// [`Enabled`](Self::Enabled) - PRF output only ever appears at
/// authentication time. That asymmetry is a protocol constraint, not a
/// policy choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrfResult {
    /// Authenticator acknowledged the extension; no output (registration).
    Enabled,
    /// Extension evaluated; raw output bytes (authentication only).
    ///
    /// Validated into `sealkey_crypto::PrfOutput` before derivation.
    EnabledWithOutput(Vec<u8>),
    /// Authenticator or browser lacks the capability.
    Unsupported,
}

/// PRF extension evaluation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrfEvalInput {
    /// The salt the authenticator evaluates its PRF over.
    pub first: [u8; 32],
}

/// User entity for credential creation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyUser {
    /// User handle bytes (the opaque user identifier).
    pub id: Vec<u8>,
    /// Account name (typically the email).
    pub name: String,
    /// Human-readable display name.
    pub display_name: String,
}

/// Requested authenticator attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorAttachment {
    /// Roaming authenticator (security key, phone); required for this
    /// subsystem so the credential is not bound to the enrolling machine.
    CrossPlatform,
}

/// Resident (discoverable) credential requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidentKeyRequirement {
    /// Credential must be discoverable without a server-provided allowlist.
    Required,
}

/// User verification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVerificationRequirement {
    /// Authenticator must verify the user (PIN, biometric).
    Required,
}

/// Authenticator selection criteria for registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorSelection {
    /// Attachment modality.
    pub attachment: AuthenticatorAttachment,
    /// Discoverable credential requirement.
    pub resident_key: ResidentKeyRequirement,
    /// User verification requirement.
    pub user_verification: UserVerificationRequirement,
}

/// Options handed to the authenticator for credential creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOptions {
    /// Relying-party identity.
    pub rp: RelyingParty,
    /// User entity the credential belongs to.
    pub user: PublicKeyUser,
    /// Challenge value the response must echo.
    pub challenge: [u8; 32],
    /// Accepted COSE algorithm identifiers, in preference order.
    pub pub_key_cred_params: Vec<i64>,
    /// Ceremony timeout hint in milliseconds.
    pub timeout_ms: u64,
    /// Attachment / discoverability / verification requirements.
    pub authenticator_selection: AuthenticatorSelection,
    /// PRF extension input (the freshly generated salt).
    pub prf_eval: PrfEvalInput,
}

/// Descriptor of an allowed credential for authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// Credential identifier.
    pub id: CredentialId,
    /// Transport hints recorded at registration.
    pub transports: Vec<Transport>,
}

/// Options handed to the authenticator for assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Relying-party identifier.
    pub rp_id: String,
    /// Challenge value the response must echo.
    pub challenge: [u8; 32],
    /// Allowed credentials; empty for the discoverable flow.
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification requirement.
    pub user_verification: UserVerificationRequirement,
    /// Ceremony timeout hint in milliseconds.
    pub timeout_ms: u64,
    /// PRF input when the salt is already known (discoverable flow).
    pub prf_eval: Option<PrfEvalInput>,
    /// Per-credential PRF inputs, from stored parameters.
    pub prf_eval_by_credential: Vec<(CredentialId, PrfEvalInput)>,
}

/// Decoded response from a credential-creation ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// Credential identifier minted by the authenticator.
    pub credential_id: CredentialId,
    /// Raw clientDataJSON bytes.
    pub client_data_json: Vec<u8>,
    /// CBOR attestation object (`fmt`, `attStmt`, `authData`).
    pub attestation_object: Vec<u8>,
    /// Transports the authenticator reports supporting.
    pub transports: Vec<Transport>,
    /// PRF extension result; must be [`PrfResult::Enabled`] to proceed.
    pub prf: PrfResult,
}

/// Decoded response from an assertion ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// Credential that produced the assertion.
    pub credential_id: CredentialId,
    /// Raw clientDataJSON bytes.
    pub client_data_json: Vec<u8>,
    /// Raw authenticator data bytes (also the signature prefix).
    pub authenticator_data: Vec<u8>,
    /// Assertion signature over `authenticator_data ‖ SHA-256(clientDataJSON)`.
    pub signature: Vec<u8>,
    /// User handle, present for discoverable credentials.
    pub user_handle: Option<Vec<u8>>,
    /// PRF extension result; output appears only here, never at registration.
    pub prf: PrfResult,
}

impl AuthenticationResponse {
    /// The user the authenticator claims this assertion belongs to, if the
    /// handle decodes as one.
    pub fn claimed_user(&self) -> Option<UserId> {
        self.user_handle
            .as_deref()
            .and_then(|handle| std::str::from_utf8(handle).ok())
            .map(UserId::new)
    }
}
