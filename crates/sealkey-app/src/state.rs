//! Flow state definitions.

use std::fmt;

/// Phase of the setup/unlock flow.
///
/// A fresh setup walks `Initial → Registering → SigningIn → Deriving →
/// Complete`;
/// registration completion transitions straight into signing in, because a
/// credential whose PRF output has never been collected cannot unlock
/// anything. A returning user enters at `ReadyToSignIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    /// No credential known for this user on this client.
    Initial,
    /// Registration ceremony in flight.
    Registering,
    /// Credential exists; no ceremony in flight; session locked.
    ReadyToSignIn,
    /// Authentication ceremony in flight.
    SigningIn,
    /// Assertion verified; key derivation and caching in flight.
    Deriving,
    /// Setup finished and the master key has been cached.
    Complete,
}

impl fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Registering => "registering",
            Self::ReadyToSignIn => "ready-to-sign-in",
            Self::SigningIn => "signing-in",
            Self::Deriving => "deriving",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Whether the session currently holds a usable master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No master key in memory.
    Locked,
    /// Master key cached for this session.
    Unlocked,
}
