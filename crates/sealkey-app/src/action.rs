//! Flow side-effects.
//!
//! [`FlowAction`] instructions are produced by the [`crate::SetupFlow`]
//! state machine for the driver to execute. The machine itself performs no
//! I/O and holds no key material.

/// Actions produced by the setup/unlock flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    /// Run a registration ceremony.
    BeginRegistration,

    /// Run an authentication ceremony.
    BeginAuthentication,

    /// Derive the master key from the collected PRF output and cache it.
    DeriveAndCacheKey,

    /// Drop the cached master key.
    ClearCachedKey,
}
