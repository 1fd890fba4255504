//! The derived symmetric master key handle.

use subtle::ConstantTimeEq as _;
use zeroize::Zeroize;

/// Size of the derived master key in bytes.
pub const MASTER_KEY_SIZE: usize = 32;

/// A derived symmetric master key.
///
/// This is the root secret for a user's end-to-end encrypted data. It exists
/// only while a session is unlocked and is destroyed on lock, logout, or
/// session teardown.
///
/// # Security
///
/// - Key bytes are zeroized when the handle is dropped
/// - No `Serialize` impl exists; the key cannot be written to durable storage
/// - `Debug` prints a placeholder, never the key bytes
/// - Equality compares in constant time
pub struct MasterKey {
    /// The 32-byte symmetric key
    key: [u8; MASTER_KEY_SIZE],
}

impl MasterKey {
    /// Wrap freshly derived key bytes.
    ///
    /// Only the derivation path constructs master keys; callers receive them
    /// from [`crate::derive_master_key`].
    pub(crate) fn new(key: [u8; MASTER_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// The raw key bytes, for handing to an AEAD cipher.
    ///
    /// Borrow only; the bytes die with the handle.
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_SIZE] {
        &self.key
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for MasterKey {}
