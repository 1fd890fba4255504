//! Application layer for Sealkey
//!
//! Pure state machine and driver for the passkey setup/unlock flow,
//! enabling deterministic simulation testing with the same code that runs
//! in production.
//!
//! # Components
//!
//! - [`SetupFlow`]: setup/unlock state machine (events in, actions out)
//! - [`SetupDriver`]: executes flow actions against an [`Authenticator`]
//! - [`SessionKeyCache`]: holds the derived master key while unlocked
//! - [`Authenticator`]: the platform credential API boundary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod authenticator;
mod cache;
mod driver;
mod event;
mod flow;
mod state;

pub use action::FlowAction;
pub use authenticator::Authenticator;
pub use cache::SessionKeyCache;
pub use driver::{DriverError, SetupDriver};
pub use event::FlowEvent;
pub use flow::{FlowError, SetupFlow};
pub use state::{LockState, SetupPhase};
