//! Durable storage abstraction for credentials and PRF parameters.
//!
//! This module provides a trait-based abstraction over the opaque keyed
//! store. The trait is synchronous (no async) so ceremony logic stays free
//! of runtime concerns; async backends adapt at their own boundary.

mod error;
mod memory;
mod records;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use records::{CredentialRecord, PrfParametersRecord};

use crate::types::{CredentialId, UserId};

/// Storage abstraction for credential and PRF parameter records.
///
/// This trait must be:
/// - Clone: Can be shared between the coordinator and management surfaces
/// - Send + Sync: Thread-safe for concurrent sessions of the same user
/// - Synchronous: No async methods
///
/// # Clone Semantics
///
/// Implementations typically share internal state via Arc, meaning clones
/// access the same underlying storage.
///
/// # Atomicity
///
/// Per-row atomicity is the only guarantee required: each method observes or
/// produces a complete record. [`advance_sign_count`] additionally performs
/// its read-check-write as one atomic step.
///
/// [`advance_sign_count`]: Storage::advance_sign_count
pub trait Storage: Clone + Send + Sync + 'static {
    /// Insert or replace a credential record.
    fn upsert_credential(&self, record: &CredentialRecord) -> Result<(), StorageError>;

    /// Look up a credential by its authenticator-minted identifier.
    ///
    /// Returns `None` if no such credential exists.
    fn credential(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<CredentialRecord>, StorageError>;

    /// All credentials registered for a user.
    fn credentials_for_user(&self, user_id: &UserId)
    -> Result<Vec<CredentialRecord>, StorageError>;

    /// Number of credentials registered for a user.
    ///
    /// The counted-existence check behind the pre-flight "has passkey"
    /// probe; cheaper than materializing the records.
    fn credential_count(&self, user_id: &UserId) -> Result<usize, StorageError>;

    /// Delete a credential owned by the given user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the credential does not exist or
    /// belongs to a different user.
    fn delete_credential(
        &self,
        user_id: &UserId,
        credential_id: &CredentialId,
    ) -> Result<(), StorageError>;

    /// Atomically advance a credential's signature counter.
    ///
    /// # Invariants
    ///
    /// - **Pre**: `new_count` must be strictly greater than the stored count
    /// - **Post**: the stored count equals `new_count` and `last_used_at_ms`
    ///   equals `used_at_ms`
    ///
    /// The comparison and the write MUST happen under one lock (or an
    /// equivalent conditional update) so concurrent authentications cannot
    /// both pass a stale check.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `new_count <= stored`, and
    /// `StorageError::NotFound` if the credential does not exist.
    fn advance_sign_count(
        &self,
        credential_id: &CredentialId,
        new_count: u32,
        used_at_ms: u64,
    ) -> Result<CredentialRecord, StorageError>;

    /// Insert or replace the PRF parameters for a credential.
    fn upsert_prf_params(&self, record: &PrfParametersRecord) -> Result<(), StorageError>;

    /// PRF parameters for a specific credential.
    ///
    /// Returns `None` if the credential has no parameters on record.
    fn prf_params_for_credential(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<PrfParametersRecord>, StorageError>;

    /// All PRF parameter records for a user.
    fn prf_params_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PrfParametersRecord>, StorageError>;

    /// Delete the PRF parameters for a credential.
    ///
    /// Deleting parameters that do not exist is not an error; revocation is
    /// idempotent at this layer.
    fn delete_prf_params(&self, credential_id: &CredentialId) -> Result<(), StorageError>;
}
