//! Sealkey ceremony core
//!
//! Relying-party side of the passkey encryption-key bootstrap: challenge
//! lifecycle, WebAuthn response verification, credential and PRF-parameter
//! persistence, and the ceremony coordinator that ties them together.
//!
//! # Ceremony Shape
//!
//! ```text
//! begin_registration ──► authenticator create() ──► complete_registration
//!        │                                                │
//!        │  (PRF acknowledged, no output)                 ▼
//!        │                                   credential + PRF salt stored
//!        ▼
//! begin_authentication ──► authenticator get() ──► complete_authentication
//!                                                        │
//!                                                        ▼
//!                                          PRF output ──► key derivation
//! ```
//!
//! The PRF output exists only in assertion responses, so every fresh setup
//! runs both ceremonies back to back. The client-side state machine living
//! in `sealkey-app` enforces that coupling; this crate verifies each
//! ceremony independently.
//!
//! # Security
//!
//! - Challenges are random, single-use, and expire after a fixed window
//! - Every response is checked for ceremony type, challenge echo, origin,
//!   relying-party hash, and user-verification flags before anything is
//!   persisted
//! - Signature counters advance atomically and strictly; a regression is
//!   treated as a cloned-credential signal
//! - Error details stay server-side; clients receive uniform messages for
//!   all verification failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ceremony;
pub mod challenge;
pub mod env;
pub mod error;
pub mod identity;
pub mod registry;
pub mod storage;
pub mod types;
pub mod webauthn;

pub use ceremony::{AuthenticationOutcome, CeremonyCoordinator};
pub use challenge::{CHALLENGE_SIZE, Challenge, ChallengeStore};
pub use env::{Environment, SystemEnv};
pub use error::CeremonyError;
pub use identity::{AccountInfo, HandoffLink, IdentityError, IdentityProvider};
pub use registry::CredentialRegistry;
pub use storage::{
    CredentialRecord, MemoryStorage, PrfParametersRecord, Storage, StorageError,
};
pub use types::{
    ChallengeRef, CoordinatorConfig, CredentialId, DeviceClass, RelyingParty, Transport, UserId,
};
pub use webauthn::{
    AuthenticationResponse, CreationOptions, PrfEvalInput, PrfResult, RegistrationResponse,
    RequestOptions,
};
