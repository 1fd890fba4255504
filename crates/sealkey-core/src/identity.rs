//! Identity collaborator boundary.
//!
//! The surrounding platform owns accounts and sessions; this subsystem only
//! consumes three operations from it. The trait is async because the
//! collaborator is typically a network hop away.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::UserId;

/// A signed-in account as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Account email.
    pub email: String,
}

/// Opaque one-time session-establishment artifact.
///
/// Handed back to the caller to finalize login on the collaborator's side;
/// its internal format is not modeled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffLink(String);

impl HandoffLink {
    /// Wrap an opaque redirect target.
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    /// The redirect target.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors from the identity collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The collaborator could not be reached or answered with an error.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Operations consumed from the identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in account, if any.
    async fn current_user(&self) -> Option<AccountInfo>;

    /// Resolve an email to a user identifier.
    ///
    /// Returns `Ok(None)` for unknown emails.
    async fn user_id_for_email(&self, email: &str) -> Result<Option<UserId>, IdentityError>;

    /// Request a one-time session-establishment link for a user that just
    /// completed an authentication ceremony.
    ///
    /// This subsystem does not mint sessions itself.
    async fn login_handoff(&self, user_id: &UserId) -> Result<HandoffLink, IdentityError>;
}
