//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist
    #[error("record not found: {record}")]
    NotFound {
        /// Description of the missing record (kind and key)
        record: String,
    },

    /// Signature counter compare-and-advance rejected the new value
    ///
    /// Raised by [`advance_sign_count`] when the presented counter is not
    /// strictly greater than the stored one. The check and the write happen
    /// under a single lock, so two concurrent authentications can never both
    /// pass against the same stored value.
    ///
    /// [`advance_sign_count`]: crate::storage::Storage::advance_sign_count
    #[error("sign count conflict: stored {stored}, presented {presented}")]
    Conflict {
        /// Counter value on record
        stored: u32,
        /// Counter value that was presented
        presented: u32,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
