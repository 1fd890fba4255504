//! Durable record shapes.
//!
//! Logical shapes only - the wire/storage encoding belongs to the backend
//! (the reference [`MemoryStorage`] keeps them as values; a relational
//! backend would map fields to columns).
//!
//! [`MemoryStorage`]: crate::storage::MemoryStorage

use serde::{Deserialize, Serialize};

use crate::types::{CredentialId, DeviceClass, Transport, UserId};

/// A registered public-key credential.
///
/// # Invariants
///
/// - `credential_id` is globally unique within the relying-party scope
/// - `sign_count` never decreases across successful authentications; a
///   decrease or repeat signals a cloned or replayed credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Owning user.
    pub user_id: UserId,
    /// Authenticator-minted identifier, unique per relying party.
    pub credential_id: CredentialId,
    /// Opaque verifier material (raw COSE key bytes).
    pub public_key_cose: Vec<u8>,
    /// Monotonic signature counter as of the last successful use.
    pub sign_count: u32,
    /// Transport hints reported at registration.
    pub transports: Vec<Transport>,
    /// Single-device or synced credential.
    pub device_class: DeviceClass,
    /// Whether the credential is currently backed up to a sync fabric.
    pub backed_up: bool,
    /// Registration time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Last successful authentication, milliseconds since the Unix epoch.
    pub last_used_at_ms: u64,
}

/// Per-user PRF derivation parameters.
///
/// Not secret: the salt only parameterizes the authenticator's PRF; without
/// the hardware credential it derives nothing.
///
/// # Invariants
///
/// - `prf_salt` is generated once and immutable. Replacing it invalidates
///   every previously derived key; there is no automatic re-derivation -
///   explicit re-setup is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrfParametersRecord {
    /// Owning user.
    pub user_id: UserId,
    /// Credential these parameters were created alongside.
    pub credential_id: CredentialId,
    /// Random per-user salt, fixed at creation.
    pub prf_salt: [u8; 32],
    /// Derivation-scheme revision tag (see `sealkey_crypto::KdfVersion`).
    pub kdf_version: u8,
}
