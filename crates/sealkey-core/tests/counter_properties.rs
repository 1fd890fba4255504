//! Property tests for the strictly-increasing signature counter.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use sealkey_core::{
    CredentialId, CredentialRecord, DeviceClass, MemoryStorage, Storage as _, StorageError,
    UserId,
};

fn record(sign_count: u32) -> CredentialRecord {
    CredentialRecord {
        user_id: UserId::new("alice"),
        credential_id: CredentialId::new(b"cred".to_vec()),
        public_key_cose: vec![0xA1],
        sign_count,
        transports: vec![],
        device_class: DeviceClass::SingleDevice,
        backed_up: false,
        created_at_ms: 0,
        last_used_at_ms: 0,
    }
}

proptest! {
    /// An advance is accepted exactly when the presented counter strictly
    /// exceeds the stored one; equality is a replay signal too.
    #[test]
    fn prop_advance_accepted_iff_strictly_greater(stored: u32, presented: u32) {
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record(stored)).unwrap();

        let result =
            storage.advance_sign_count(&CredentialId::new(b"cred".to_vec()), presented, 1_000);

        if presented > stored {
            let updated = result.unwrap();
            prop_assert_eq!(updated.sign_count, presented);
            prop_assert_eq!(updated.last_used_at_ms, 1_000);
        } else {
            match result {
                Err(StorageError::Conflict { stored: s, presented: p }) => {
                    prop_assert_eq!(s, stored);
                    prop_assert_eq!(p, presented);
                },
                other => prop_assert!(false, "expected Conflict, got {:?}", other),
            }
        }
    }

    /// A rejected advance leaves the stored record untouched.
    #[test]
    fn prop_rejected_advance_does_not_mutate(stored: u32, presented in 0u32..=u32::MAX) {
        prop_assume!(presented <= stored);
        let storage = MemoryStorage::new();
        storage.upsert_credential(&record(stored)).unwrap();

        let id = CredentialId::new(b"cred".to_vec());
        let _ = storage.advance_sign_count(&id, presented, 1_000);

        let unchanged = storage.credential(&id).unwrap().unwrap();
        prop_assert_eq!(unchanged.sign_count, stored);
        prop_assert_eq!(unchanged.last_used_at_ms, 0);
    }
}
