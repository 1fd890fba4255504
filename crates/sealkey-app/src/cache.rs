//! In-memory session key cache.

use sealkey_crypto::MasterKey;

/// Holds the derived master key for the lifetime of an unlocked session.
///
/// The key lives only here: never serialized, never logged, zeroized on
/// drop by [`MasterKey`] itself. Locking simply drops the key; unlocking
/// again requires a full authentication ceremony because the PRF output
/// cannot be re-obtained any other way.
#[derive(Debug, Default)]
pub struct SessionKeyCache {
    key: Option<MasterKey>,
}

impl SessionKeyCache {
    /// Create an empty (locked) cache.
    pub fn new() -> Self {
        Self { key: None }
    }

    /// Cache a freshly derived master key, replacing any previous one.
    pub fn store(&mut self, key: MasterKey) {
        self.key = Some(key);
    }

    /// Drop the cached key. Idempotent.
    pub fn lock(&mut self) {
        self.key = None;
    }

    /// True while a key is cached.
    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    /// Borrow the cached key for an encryption operation.
    pub fn key(&self) -> Option<&MasterKey> {
        self.key.as_ref()
    }

    /// Run a closure over the cached key without letting the borrow
    /// escape. Returns `None` while locked.
    pub fn with_key<R>(&self, f: impl FnOnce(&MasterKey) -> R) -> Option<R> {
        self.key.as_ref().map(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealkey_crypto::{KdfVersion, PrfOutput, derive_master_key};

    use super::*;

    fn key() -> MasterKey {
        let output = PrfOutput::from_bytes(&[7u8; 32]).unwrap();
        derive_master_key(&output, &[9u8; 32], KdfVersion::V1)
    }

    #[test]
    fn starts_locked() {
        let cache = SessionKeyCache::new();
        assert!(!cache.is_unlocked());
        assert!(cache.key().is_none());
    }

    #[test]
    fn store_then_lock_round_trip() {
        let mut cache = SessionKeyCache::new();
        cache.store(key());
        assert!(cache.is_unlocked());
        assert!(cache.key().is_some());

        cache.lock();
        assert!(!cache.is_unlocked());
        assert!(cache.key().is_none());

        // Locking twice is fine
        cache.lock();
        assert!(!cache.is_unlocked());
    }
}
