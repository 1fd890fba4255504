//! In-memory reference storage backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    storage::{CredentialRecord, PrfParametersRecord, Storage, StorageError},
    types::{CredentialId, UserId},
};

#[derive(Debug, Default)]
struct Inner {
    credentials: HashMap<CredentialId, CredentialRecord>,
    prf_params: HashMap<CredentialId, PrfParametersRecord>,
}

/// In-memory storage backend.
///
/// Reference implementation of [`Storage`]: every operation takes the single
/// internal lock, which trivially satisfies the per-row atomicity and
/// compare-and-advance requirements. Clones share state via `Arc`.
///
/// Used by tests and by embedders that keep durable persistence elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Io("storage lock poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn upsert_credential(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.credentials.insert(record.credential_id.clone(), record.clone());
        Ok(())
    }

    fn credential(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<CredentialRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.credentials.get(credential_id).cloned())
    }

    fn credentials_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CredentialRecord>, StorageError> {
        let inner = self.lock()?;
        let mut records: Vec<CredentialRecord> = inner
            .credentials
            .values()
            .filter(|record| &record.user_id == user_id)
            .cloned()
            .collect();
        // Deterministic order for callers and tests
        records.sort_by_key(|record| record.created_at_ms);
        Ok(records)
    }

    fn credential_count(&self, user_id: &UserId) -> Result<usize, StorageError> {
        let inner = self.lock()?;
        Ok(inner.credentials.values().filter(|record| &record.user_id == user_id).count())
    }

    fn delete_credential(
        &self,
        user_id: &UserId,
        credential_id: &CredentialId,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let owned = inner
            .credentials
            .get(credential_id)
            .is_some_and(|record| &record.user_id == user_id);
        if !owned {
            return Err(StorageError::NotFound {
                record: format!("credential {credential_id} for user {user_id}"),
            });
        }
        inner.credentials.remove(credential_id);
        Ok(())
    }

    fn advance_sign_count(
        &self,
        credential_id: &CredentialId,
        new_count: u32,
        used_at_ms: u64,
    ) -> Result<CredentialRecord, StorageError> {
        // Single lock for the whole read-check-write
        let mut inner = self.lock()?;
        let record = inner.credentials.get_mut(credential_id).ok_or_else(|| {
            StorageError::NotFound { record: format!("credential {credential_id}") }
        })?;
        if new_count <= record.sign_count {
            return Err(StorageError::Conflict {
                stored: record.sign_count,
                presented: new_count,
            });
        }
        record.sign_count = new_count;
        record.last_used_at_ms = used_at_ms;
        Ok(record.clone())
    }

    fn upsert_prf_params(&self, record: &PrfParametersRecord) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.prf_params.insert(record.credential_id.clone(), record.clone());
        Ok(())
    }

    fn prf_params_for_credential(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<PrfParametersRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.prf_params.get(credential_id).cloned())
    }

    fn prf_params_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PrfParametersRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .prf_params
            .values()
            .filter(|record| &record.user_id == user_id)
            .cloned()
            .collect())
    }

    fn delete_prf_params(&self, credential_id: &CredentialId) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        inner.prf_params.remove(credential_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::DeviceClass;

    fn record(user: &str, id: &[u8], count: u32) -> CredentialRecord {
        CredentialRecord {
            user_id: UserId::new(user),
            credential_id: CredentialId::new(id.to_vec()),
            public_key_cose: vec![0xA5],
            sign_count: count,
            transports: vec![],
            device_class: DeviceClass::SingleDevice,
            backed_up: false,
            created_at_ms: 1_000,
            last_used_at_ms: 1_000,
        }
    }

    #[test]
    fn upsert_then_lookup() {
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record("alice", b"cred-1", 0)).unwrap();

        let found = storage.credential(&CredentialId::new(b"cred-1".to_vec())).unwrap();
        assert_eq!(found.map(|r| r.sign_count), Some(0));
    }

    #[test]
    fn clones_share_state() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        clone.upsert_credential(&record("alice", b"cred-1", 0)).unwrap();

        assert_eq!(storage.credential_count(&UserId::new("alice")).unwrap(), 1);
    }

    #[test]
    fn advance_sign_count_accepts_strict_increase() {
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record("alice", b"cred-1", 3)).unwrap();

        let updated = storage
            .advance_sign_count(&CredentialId::new(b"cred-1".to_vec()), 4, 2_000)
            .unwrap();
        assert_eq!(updated.sign_count, 4);
        assert_eq!(updated.last_used_at_ms, 2_000);
    }

    #[test]
    fn advance_sign_count_rejects_equal_and_lower() {
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record("alice", b"cred-1", 3)).unwrap();
        let id = CredentialId::new(b"cred-1".to_vec());

        assert_eq!(
            storage.advance_sign_count(&id, 3, 2_000),
            Err(StorageError::Conflict { stored: 3, presented: 3 })
        );
        assert_eq!(
            storage.advance_sign_count(&id, 1, 2_000),
            Err(StorageError::Conflict { stored: 3, presented: 1 })
        );
        // Stored value unchanged after rejected attempts
        assert_eq!(storage.credential(&id).unwrap().map(|r| r.sign_count), Some(3));
    }

    #[test]
    fn delete_requires_matching_owner() {
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record("alice", b"cred-1", 0)).unwrap();
        let id = CredentialId::new(b"cred-1".to_vec());

        let result = storage.delete_credential(&UserId::new("mallory"), &id);
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert!(storage.credential(&id).unwrap().is_some());

        storage.delete_credential(&UserId::new("alice"), &id).unwrap();
        assert!(storage.credential(&id).unwrap().is_none());
    }

    #[test]
    fn prf_params_round_trip_and_idempotent_delete() {
        let storage = MemoryStorage::new();
        let params = PrfParametersRecord {
            user_id: UserId::new("alice"),
            credential_id: CredentialId::new(b"cred-1".to_vec()),
            prf_salt: [7u8; 32],
            kdf_version: 1,
        };
        storage.upsert_prf_params(&params).unwrap();

        let found = storage
            .prf_params_for_credential(&CredentialId::new(b"cred-1".to_vec()))
            .unwrap();
        assert_eq!(found, Some(params));

        storage.delete_prf_params(&CredentialId::new(b"cred-1".to_vec())).unwrap();
        storage.delete_prf_params(&CredentialId::new(b"cred-1".to_vec())).unwrap();
    }

    #[test]
    fn credentials_for_user_sorted_by_creation() {
        let storage = MemoryStorage::new();
        let mut older = record("alice", b"cred-old", 0);
        older.created_at_ms = 500;
        storage.upsert_credential(&record("alice", b"cred-new", 0)).unwrap();
        storage.upsert_credential(&older).unwrap();
        storage.upsert_credential(&record("bob", b"cred-bob", 0)).unwrap();

        let records = storage.credentials_for_user(&UserId::new("alice")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].credential_id, CredentialId::new(b"cred-old".to_vec()));
    }
}
