//! Authenticator data parsing.
//!
//! The authenticator data structure is a packed binary layout:
//!
//! ```text
//! rpIdHash (32) ‖ flags (1) ‖ signCount (4, BE)
//!   [ ‖ attestedCredentialData: aaguid (16) ‖ credIdLen (2, BE)
//!       ‖ credentialId ‖ credentialPublicKey (COSE, CBOR) ]
//!   [ ‖ extensions (CBOR) ]
//! ```
//!
//! Attested credential data is present only when the AT flag is set
//! (registration); assertions carry just the fixed 37-byte prefix plus
//! optional extensions.

use std::io::Cursor;

use crate::error::CeremonyError;

/// Flag bits within the authenticator data flags byte.
pub mod flags {
    /// User present.
    pub const UP: u8 = 0x01;
    /// User verified (PIN, biometric).
    pub const UV: u8 = 0x04;
    /// Backup eligible (synced / multi-device credential).
    pub const BE: u8 = 0x08;
    /// Currently backed up.
    pub const BS: u8 = 0x10;
    /// Attested credential data included.
    pub const AT: u8 = 0x40;
    /// Extension data included.
    pub const ED: u8 = 0x80;
}

/// Minimum length: rpIdHash + flags + signCount.
const FIXED_PREFIX_LEN: usize = 37;

/// Attested credential data from a registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    /// Authenticator model identifier.
    pub aaguid: [u8; 16],
    /// Credential identifier bytes.
    pub credential_id: Vec<u8>,
    /// Raw COSE public key bytes, exactly as attested.
    pub public_key_cose: Vec<u8>,
}

/// Parsed authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    /// SHA-256 of the relying-party identifier.
    pub rp_id_hash: [u8; 32],
    /// Flags byte; see [`flags`].
    pub flags: u8,
    /// Authenticator signature counter.
    pub sign_count: u32,
    /// Present when the AT flag is set.
    pub attested: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse the packed structure.
    ///
    /// Every length check fails closed as a verification failure; malformed
    /// authenticator data never panics or partially parses.
    pub fn parse(raw: &[u8]) -> Result<Self, CeremonyError> {
        if raw.len() < FIXED_PREFIX_LEN {
            return Err(CeremonyError::verification(format!(
                "authenticator data too short: {} bytes",
                raw.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&raw[0..32]);
        let flag_bits = raw[32];
        let sign_count = u32::from_be_bytes([raw[33], raw[34], raw[35], raw[36]]);

        let attested = if flag_bits & flags::AT != 0 {
            Some(Self::parse_attested(&raw[FIXED_PREFIX_LEN..])?)
        } else {
            None
        };

        Ok(Self { rp_id_hash, flags: flag_bits, sign_count, attested })
    }

    fn parse_attested(raw: &[u8]) -> Result<AttestedCredentialData, CeremonyError> {
        if raw.len() < 18 {
            return Err(CeremonyError::verification("attested credential data truncated"));
        }

        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&raw[0..16]);
        let id_len = usize::from(u16::from_be_bytes([raw[16], raw[17]]));

        let id_end = 18usize.checked_add(id_len).filter(|&end| end <= raw.len()).ok_or_else(
            || CeremonyError::verification("credential id length exceeds authenticator data"),
        )?;
        let credential_id = raw[18..id_end].to_vec();
        if credential_id.is_empty() {
            return Err(CeremonyError::verification("empty credential id"));
        }

        // The COSE key is a single CBOR value; its length is only known by
        // decoding it. Track the cursor to slice out the raw bytes.
        let mut cursor = Cursor::new(&raw[id_end..]);
        let _cose: ciborium::value::Value = ciborium::de::from_reader(&mut cursor)
            .map_err(|err| CeremonyError::verification(format!("COSE key CBOR: {err}")))?;
        let cose_len = cursor.position() as usize;
        let public_key_cose = raw[id_end..id_end + cose_len].to_vec();

        Ok(AttestedCredentialData { aaguid, credential_id, public_key_cose })
    }

    /// True if the given flag bit(s) are set.
    pub fn has_flags(&self, bits: u8) -> bool {
        self.flags & bits == bits
    }
}
