//! Core identifier and configuration types.
//!
//! Opaque newtypes for the identifiers that cross component boundaries, plus
//! the relying-party identity and coordinator configuration the embedding
//! application constructs at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque user identifier assigned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a collaborator-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as bytes, for the authenticator user handle.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque credential identifier minted by the authenticator.
///
/// Globally unique within a relying-party scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(Vec<u8>);

impl CredentialId {
    /// Wrap raw credential identifier bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    /// Hex rendering for logs; credential IDs are not secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Opaque server-side handle for an issued challenge.
///
/// Not derived from the challenge value; knowing the reference reveals
/// nothing about the value it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeRef(u128);

impl ChallengeRef {
    /// Wrap a random handle.
    pub fn new(handle: u128) -> Self {
        Self(handle)
    }
}

impl std::fmt::Display for ChallengeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Transport hint reported by the authenticator at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// USB HID security key.
    Usb,
    /// NFC tap.
    Nfc,
    /// Bluetooth Low Energy.
    Ble,
    /// Cross-device (phone-as-key) flow.
    Hybrid,
    /// Platform-internal authenticator.
    Internal,
}

/// Whether a credential is bound to one device or synced across several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    /// Hardware-bound credential; exists on exactly one authenticator.
    SingleDevice,
    /// Synced (multi-device) passkey; may be restored on other devices.
    MultiDevice,
}

/// The logical service identity credentials are scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Relying-party identifier (effective domain, e.g. `example.com`).
    pub id: String,
    /// Human-readable service name shown in authenticator prompts.
    pub name: String,
    /// Origins accepted in clientDataJSON (scheme + host + optional port).
    pub origins: Vec<String>,
}

impl RelyingParty {
    /// Create a relying-party identity.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        origins: Vec<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), origins }
    }
}

/// Tunable limits for ceremony coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long an issued challenge stays consumable.
    pub challenge_ttl: Duration,
    /// Timeout hint passed to the authenticator in ceremony options.
    pub ceremony_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            // Five minutes, enforced server-side regardless of what the
            // client presents.
            challenge_ttl: Duration::from_secs(300),
            ceremony_timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn credential_id_displays_as_hex() {
        let id = CredentialId::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(id.to_string(), "deadbeef");
    }

    #[test]
    fn default_challenge_ttl_is_five_minutes() {
        assert_eq!(CoordinatorConfig::default().challenge_ttl, Duration::from_secs(300));
    }

    #[test]
    fn user_id_round_trips() {
        let id = UserId::new("user-17");
        assert_eq!(id.as_str(), "user-17");
        assert_eq!(id.as_bytes(), b"user-17");
    }
}
