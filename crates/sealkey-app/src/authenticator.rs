//! Authenticator abstraction.

use async_trait::async_trait;
use sealkey_core::{
    AuthenticationResponse, CeremonyError, CreationOptions, RegistrationResponse, RequestOptions,
};

/// The platform credential API, as seen by the driver.
///
/// In production this is backed by the browser's `navigator.credentials`;
/// in tests by a simulated hardware key. Both ceremonies are user-mediated
/// and slow; cancellation surfaces as
/// [`CeremonyError::UserCancelled`] and a deadline as
/// [`CeremonyError::Timeout`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run a credential-creation ceremony.
    async fn create_credential(
        &self,
        options: &CreationOptions,
    ) -> Result<RegistrationResponse, CeremonyError>;

    /// Run an assertion ceremony.
    async fn get_credential(
        &self,
        options: &RequestOptions,
    ) -> Result<AuthenticationResponse, CeremonyError>;
}
