//! Error taxonomy for ceremony coordination.
//!
//! Strongly-typed errors for the registration/authentication ceremonies.
//! Two policies live alongside the types:
//!
//! - `is_retryable` distinguishes user-recoverable failures (cancellation,
//!   timeout) from security failures.
//! - `client_message` is the only text shown to end users. Cryptographic
//!   failures collapse into one generic message so callers cannot build an
//!   oracle out of the distinctions; capability failures keep actionable
//!   guidance because they are not security-sensitive.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur during a registration or authentication ceremony.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    /// Challenge was presented after its expiry window
    #[error("challenge expired")]
    ChallengeExpired,

    /// Challenge is unknown, malformed, or already consumed
    #[error("challenge not found")]
    ChallengeNotFound,

    /// Signature, origin, or relying-party verification failed
    ///
    /// The detail string is for server-side logs only; it never reaches the
    /// client.
    #[error("verification failed: {detail}")]
    VerificationFailed {
        /// Internal description of what failed to verify
        detail: String,
    },

    /// Reported signature counter did not strictly increase
    ///
    /// A repeat or regression signals a cloned or replayed credential. This
    /// is a security incident, not a user error: it is logged distinctly at
    /// high severity but surfaced to the client exactly like
    /// [`VerificationFailed`].
    #[error("signature counter regressed: stored {stored}, presented {presented}")]
    CounterRegressed {
        /// Counter value on record before the attempt
        stored: u32,
        /// Counter value the response reported
        presented: u32,
    },

    /// Authenticator or browser lacks the PRF capability
    ///
    /// Terminal for this device; the user needs a different authenticator.
    #[error("authenticator does not support the PRF extension")]
    PrfUnsupported,

    /// User dismissed or denied the authenticator prompt
    #[error("user cancelled the authenticator prompt")]
    UserCancelled,

    /// Ceremony did not complete within the allotted time
    #[error("ceremony timed out")]
    Timeout,

    /// Durable storage operation failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Key derivation rejected its inputs
    #[error("key derivation error: {0}")]
    Kdf(#[from] sealkey_crypto::KdfError),
}

impl CeremonyError {
    /// Returns true if the user may simply retry the ceremony.
    ///
    /// Cancellation and timeout are recoverable without data loss. Every
    /// other variant either requires different hardware (`PrfUnsupported`)
    /// or indicates a forged, replayed, or broken response - retrying with
    /// the same material cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UserCancelled | Self::Timeout)
    }

    /// The message shown to the end user.
    ///
    /// `CounterRegressed` intentionally returns the same text as
    /// `VerificationFailed`: distinguishing them would tell an attacker the
    /// cloned credential was otherwise valid.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::ChallengeExpired => "This sign-in attempt expired. Please try again.",
            Self::ChallengeNotFound
            | Self::VerificationFailed { .. }
            | Self::CounterRegressed { .. }
            | Self::Storage(_)
            | Self::Kdf(_) => "Authentication failed.",
            Self::PrfUnsupported => {
                "This security key does not support encryption. \
                 Please use a different device."
            },
            Self::UserCancelled => "The security key prompt was cancelled.",
            Self::Timeout => "The security key did not respond in time. Please try again.",
        }
    }

    /// Shorthand for a verification failure with an internal detail string.
    pub(crate) fn verification(detail: impl Into<String>) -> Self {
        Self::VerificationFailed { detail: detail.into() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_and_timeout_are_retryable() {
        assert!(CeremonyError::UserCancelled.is_retryable());
        assert!(CeremonyError::Timeout.is_retryable());
    }

    #[test]
    fn security_failures_are_not_retryable() {
        assert!(!CeremonyError::ChallengeExpired.is_retryable());
        assert!(!CeremonyError::ChallengeNotFound.is_retryable());
        assert!(!CeremonyError::verification("origin mismatch").is_retryable());
        assert!(!CeremonyError::CounterRegressed { stored: 5, presented: 5 }.is_retryable());
        assert!(!CeremonyError::PrfUnsupported.is_retryable());
    }

    #[test]
    fn counter_regression_is_indistinguishable_from_verification_failure() {
        let regressed = CeremonyError::CounterRegressed { stored: 9, presented: 3 };
        let failed = CeremonyError::verification("bad signature");
        assert_eq!(regressed.client_message(), failed.client_message());
    }

    #[test]
    fn client_message_never_contains_internal_detail() {
        let err = CeremonyError::verification("rpIdHash mismatch for example.com");
        assert!(!err.client_message().contains("rpIdHash"));
        assert!(!err.client_message().contains("example.com"));
    }

    #[test]
    fn prf_unsupported_gives_actionable_guidance() {
        assert!(CeremonyError::PrfUnsupported.client_message().contains("different device"));
    }
}
