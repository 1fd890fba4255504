//! Sealkey Key Derivation Primitives
//!
//! Cryptographic building blocks for the passkey-based encryption bootstrap.
//! Pure functions with deterministic outputs. Callers provide the PRF output
//! and salt, so every derivation is reproducible in tests.
//!
//! # Key Lifecycle
//!
//! The master key is rooted in hardware: the authenticator evaluates its PRF
//! over a per-user salt during an authentication ceremony, and the 32-byte
//! PRF output never exists outside that ceremony's result. The derivation
//! below stretches it into the session master key.
//!
//! ```text
//! Authenticator PRF (hardware, per credential)
//!        │  evaluated over prf_salt at authentication time
//!        ▼
//! PRF Output (32 bytes, ephemeral)
//!        │
//!        ▼
//! HKDF-SHA256(salt = prf_salt, info = label ‖ version) → Master Key
//! ```
//!
//! The master key exists only while a session is unlocked. It is zeroized on
//! drop and has no serializable representation.
//!
//! # Security
//!
//! Determinism:
//! - Same `(prf_output, prf_salt, version)` always yields the same key
//! - Any single input change yields a statistically unrelated key
//!
//! Fail-closed input validation:
//! - PRF output must be exactly [`PRF_OUTPUT_SIZE`] bytes; anything else is
//!   rejected before HKDF runs
//!
//! Containment:
//! - [`MasterKey`] implements neither `Serialize` nor value-leaking `Debug`
//! - Key bytes are zeroized when the handle is dropped

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod derive;
mod error;
mod master_key;

pub use derive::{KdfVersion, PRF_OUTPUT_SIZE, PRF_SALT_SIZE, PrfOutput, derive_master_key};
pub use error::KdfError;
pub use master_key::{MASTER_KEY_SIZE, MasterKey};
