//! Error types for key derivation.

use thiserror::Error;

/// Errors that can occur during master key derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KdfError {
    /// PRF output had an unexpected length
    ///
    /// The authenticator's PRF evaluation always yields exactly 32 bytes.
    /// Anything else means the extension result was truncated or tampered
    /// with, and derivation must not proceed.
    #[error("invalid PRF output length: expected {expected}, got {got}")]
    InvalidPrfOutput {
        /// Required PRF output length in bytes
        expected: usize,
        /// Length that was presented
        got: usize,
    },

    /// Derivation scheme version is not supported by this build
    #[error("unsupported derivation scheme version: {0}")]
    UnsupportedVersion(u8),
}
