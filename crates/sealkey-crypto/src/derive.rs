//! Master key derivation from authenticator PRF output using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KdfError, MASTER_KEY_SIZE, MasterKey};

/// Label used for master key derivation (domain separation)
const MASTER_KEY_LABEL: &[u8] = b"sealkeyMasterV1";

/// Required length of the authenticator PRF output in bytes.
pub const PRF_OUTPUT_SIZE: usize = 32;

/// Length of the per-user PRF salt in bytes.
pub const PRF_SALT_SIZE: usize = 32;

/// Derivation scheme revision.
///
/// Stored alongside the per-user salt so future scheme changes can coexist
/// with keys derived under earlier revisions. Changing the version yields an
/// unrelated master key from the same PRF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KdfVersion {
    /// HKDF-SHA256 over the raw 32-byte PRF output.
    V1 = 1,
}

impl KdfVersion {
    /// The revision new parameter sets are pinned to.
    pub const CURRENT: Self = Self::V1;

    /// Wire/storage tag for this revision.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a stored revision tag.
    pub fn from_tag(tag: u8) -> Result<Self, KdfError> {
        match tag {
            1 => Ok(Self::V1),
            other => Err(KdfError::UnsupportedVersion(other)),
        }
    }
}

/// Validated authenticator PRF output.
///
/// The PRF extension evaluates a pseudo-random function inside the
/// authenticator and returns exactly 32 bytes. This wrapper enforces that
/// length at the boundary so derivation never runs on truncated or padded
/// material.
///
/// Zeroized on drop; the output is key material in its own right.
#[derive(Clone)]
pub struct PrfOutput {
    bytes: [u8; PRF_OUTPUT_SIZE],
}

impl PrfOutput {
    /// Validate and wrap raw extension-result bytes.
    ///
    /// Fails closed on any length other than [`PRF_OUTPUT_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KdfError> {
        let exact: [u8; PRF_OUTPUT_SIZE] = bytes
            .try_into()
            .map_err(|_| KdfError::InvalidPrfOutput { expected: PRF_OUTPUT_SIZE, got: bytes.len() })?;
        Ok(Self { bytes: exact })
    }

    /// The raw PRF output bytes.
    pub fn as_bytes(&self) -> &[u8; PRF_OUTPUT_SIZE] {
        &self.bytes
    }
}

impl Drop for PrfOutput {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PrfOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrfOutput(..)")
    }
}

/// Derive the session master key from authenticator PRF output.
///
/// Deterministic one-way function of `(prf_output, prf_salt, version)`:
/// HKDF-SHA256 with the per-user salt as the extract salt, the PRF output as
/// input key material, and `label ‖ version` as the expand info.
///
/// # Security
///
/// - Same inputs always produce the same key (a user can re-unlock on any
///   device holding the same credential and salt)
/// - Different salts, versions, or PRF outputs produce unrelated keys
/// - No partial-key leakage: HKDF output is indistinguishable from random
///   under a single changed input bit
pub fn derive_master_key(
    prf_output: &PrfOutput,
    prf_salt: &[u8; PRF_SALT_SIZE],
    version: KdfVersion,
) -> MasterKey {
    let hkdf = Hkdf::<Sha256>::new(Some(prf_salt), prf_output.as_bytes());

    // Build the info parameter: label || version tag
    // Capacity: 15 (label) + 1 (version) = 16
    let mut info = Vec::with_capacity(16);
    info.extend_from_slice(MASTER_KEY_LABEL);
    info.push(version.tag());

    let mut key = [0u8; MASTER_KEY_SIZE];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    MasterKey::new(key)
}
