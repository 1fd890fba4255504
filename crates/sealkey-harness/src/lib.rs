//! Deterministic simulation harness for Sealkey ceremony testing.
//!
//! Virtual-time, seeded-RNG implementations of the environment,
//! authenticator, and identity boundaries, so full setup/unlock flows run
//! reproducibly with no hardware and no network.
//!
//! The [`FakeAuthenticator`] is not a mock: it holds real Ed25519 keys and
//! produces responses the relying-party verification code accepts or
//! rejects on their cryptographic merits. Tests that tamper with a
//! response are exercising the same checks production traffic hits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_authenticator;
pub mod sim_env;
pub mod stub_identity;
pub mod world;

pub use fake_authenticator::FakeAuthenticator;
pub use sim_env::{SimEnv, SimInstant};
pub use stub_identity::StubIdentity;
pub use world::{TEST_ORIGIN, TestWorld};
