//! Flow input events.
//!
//! [`FlowEvent`] is the full set of inputs that drive the
//! [`crate::SetupFlow`] state machine. Events report what happened at the
//! ceremony or session boundary; the machine decides what it means for the
//! current phase.

/// Events processed by the setup/unlock flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// User chose to set up a passkey (fresh account, no credential yet).
    StartSetup,

    /// Registration ceremony verified and persisted server-side.
    RegistrationCompleted,

    /// Client already has registered credentials; skip straight to
    /// sign-in readiness.
    ResumeWithCredentials,

    /// User chose to sign in with an existing credential.
    StartSignIn,

    /// Authentication ceremony verified; PRF output is available.
    AuthenticationSucceeded,

    /// Master key derived and placed in the session cache.
    KeyCached,

    /// The in-flight ceremony failed, was cancelled, or timed out.
    CeremonyFailed,

    /// User or policy requested the session be locked.
    Lock,
}

impl FlowEvent {
    /// Stable name for error reporting and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSetup => "start-setup",
            Self::RegistrationCompleted => "registration-completed",
            Self::ResumeWithCredentials => "resume-with-credentials",
            Self::StartSignIn => "start-sign-in",
            Self::AuthenticationSucceeded => "authentication-succeeded",
            Self::KeyCached => "key-cached",
            Self::CeremonyFailed => "ceremony-failed",
            Self::Lock => "lock",
        }
    }
}
