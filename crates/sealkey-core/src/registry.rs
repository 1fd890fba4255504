//! Durable credential registry.
//!
//! Thin policy layer over [`Storage`]: owns the replay-protection counter
//! semantics and the coupled lifecycle of a credential and its PRF
//! parameters. Ceremony verification happens before anything reaches this
//! layer; what arrives here is already cryptographically checked.

use tracing::{debug, error};

use crate::{
    error::CeremonyError,
    storage::{CredentialRecord, PrfParametersRecord, Storage, StorageError},
    types::{CredentialId, UserId},
};

/// Registry of public-key credentials and their PRF parameters.
///
/// Clones share the underlying storage.
#[derive(Debug, Clone)]
pub struct CredentialRegistry<S: Storage> {
    storage: S,
}

impl<S: Storage> CredentialRegistry<S> {
    /// Create a registry over the given storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Persist a newly registered credential together with its PRF
    /// parameters.
    ///
    /// The two records are written credential-first so a crash between the
    /// writes leaves a credential without parameters (recoverable by
    /// re-setup) rather than parameters pointing at nothing.
    pub fn persist_registration(
        &self,
        credential: &CredentialRecord,
        params: &PrfParametersRecord,
    ) -> Result<(), CeremonyError> {
        self.storage.upsert_credential(credential)?;
        self.storage.upsert_prf_params(params)?;
        debug!(
            credential_id = %credential.credential_id,
            user_id = %credential.user_id,
            "registered credential"
        );
        Ok(())
    }

    /// Look up a credential by identifier.
    pub fn credential(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<CredentialRecord>, CeremonyError> {
        Ok(self.storage.credential(credential_id)?)
    }

    /// All credentials registered for a user, oldest first.
    pub fn list_credentials(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CredentialRecord>, CeremonyError> {
        Ok(self.storage.credentials_for_user(user_id)?)
    }

    /// Whether the user has at least one registered credential.
    pub fn user_has_credentials(&self, user_id: &UserId) -> Result<bool, CeremonyError> {
        Ok(self.storage.credential_count(user_id)? > 0)
    }

    /// Delete a credential and its PRF parameters.
    ///
    /// Previously derived keys become unrecoverable through this credential;
    /// that is the point of revocation.
    pub fn revoke_credential(
        &self,
        user_id: &UserId,
        credential_id: &CredentialId,
    ) -> Result<(), CeremonyError> {
        self.storage.delete_credential(user_id, credential_id)?;
        self.storage.delete_prf_params(credential_id)?;
        debug!(%credential_id, %user_id, "revoked credential");
        Ok(())
    }

    /// PRF parameters for a credential.
    pub fn prf_params(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<PrfParametersRecord>, CeremonyError> {
        Ok(self.storage.prf_params_for_credential(credential_id)?)
    }

    /// Record a successful authentication: atomically advance the signature
    /// counter and stamp `last_used_at`.
    ///
    /// A counter that fails to strictly increase is a cloned-credential
    /// signal: logged at ERROR with full context, surfaced to callers as
    /// [`CeremonyError::CounterRegressed`] (which client-facing layers
    /// render identically to a generic verification failure).
    pub fn record_authentication(
        &self,
        credential_id: &CredentialId,
        new_count: u32,
        used_at_ms: u64,
    ) -> Result<CredentialRecord, CeremonyError> {
        match self.storage.advance_sign_count(credential_id, new_count, used_at_ms) {
            Ok(record) => {
                debug!(%credential_id, sign_count = new_count, "authentication recorded");
                Ok(record)
            },
            Err(StorageError::Conflict { stored, presented }) => {
                error!(
                    %credential_id,
                    stored,
                    presented,
                    "signature counter did not increase: possible cloned credential"
                );
                Err(CeremonyError::CounterRegressed { stored, presented })
            },
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{storage::MemoryStorage, types::DeviceClass};

    fn registry() -> CredentialRegistry<MemoryStorage> {
        CredentialRegistry::new(MemoryStorage::new())
    }

    fn credential(user: &str, id: &[u8]) -> CredentialRecord {
        CredentialRecord {
            user_id: UserId::new(user),
            credential_id: CredentialId::new(id.to_vec()),
            public_key_cose: vec![0xA5],
            sign_count: 0,
            transports: vec![],
            device_class: DeviceClass::SingleDevice,
            backed_up: false,
            created_at_ms: 0,
            last_used_at_ms: 0,
        }
    }

    fn params(user: &str, id: &[u8]) -> PrfParametersRecord {
        PrfParametersRecord {
            user_id: UserId::new(user),
            credential_id: CredentialId::new(id.to_vec()),
            prf_salt: [9u8; 32],
            kdf_version: 1,
        }
    }

    #[test]
    fn registration_persists_both_records() {
        let registry = registry();
        registry
            .persist_registration(&credential("alice", b"cred"), &params("alice", b"cred"))
            .unwrap();

        let id = CredentialId::new(b"cred".to_vec());
        assert!(registry.credential(&id).unwrap().is_some());
        assert!(registry.prf_params(&id).unwrap().is_some());
        assert!(registry.user_has_credentials(&UserId::new("alice")).unwrap());
    }

    #[test]
    fn counter_regression_maps_to_ceremony_error() {
        let registry = registry();
        registry
            .persist_registration(&credential("alice", b"cred"), &params("alice", b"cred"))
            .unwrap();
        let id = CredentialId::new(b"cred".to_vec());

        registry.record_authentication(&id, 1, 100).unwrap();

        let replay = registry.record_authentication(&id, 1, 200);
        assert_eq!(replay, Err(CeremonyError::CounterRegressed { stored: 1, presented: 1 }));

        // Stored state untouched by the rejected attempt
        let record = registry.credential(&id).unwrap().unwrap();
        assert_eq!(record.sign_count, 1);
        assert_eq!(record.last_used_at_ms, 100);
    }

    #[test]
    fn revocation_removes_credential_and_params() {
        let registry = registry();
        registry
            .persist_registration(&credential("alice", b"cred"), &params("alice", b"cred"))
            .unwrap();
        let id = CredentialId::new(b"cred".to_vec());

        registry.revoke_credential(&UserId::new("alice"), &id).unwrap();
        assert!(registry.credential(&id).unwrap().is_none());
        assert!(registry.prf_params(&id).unwrap().is_none());
        assert!(!registry.user_has_credentials(&UserId::new("alice")).unwrap());
    }

    #[test]
    fn unknown_credential_authentication_is_storage_error() {
        let registry = registry();
        let result =
            registry.record_authentication(&CredentialId::new(b"ghost".to_vec()), 1, 100);
        assert!(matches!(result, Err(CeremonyError::Storage(_))));
    }
}
