//! One-time authentication challenges.
//!
//! Challenges are issued server-side, live for a fixed window, and are
//! consumed at most once. The store is keyed by an opaque reference rather
//! than by user, because discoverable (returning-user) flows begin before
//! any identity is known.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use subtle::ConstantTimeEq;

use crate::{
    env::Environment,
    error::CeremonyError,
    types::{ChallengeRef, UserId},
};

/// Size of a challenge value in bytes.
pub const CHALLENGE_SIZE: usize = 32;

/// An issued challenge, as handed to the ceremony layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Cryptographically random value the authenticator signs over.
    pub value: [u8; CHALLENGE_SIZE],
    /// User the challenge is bound to; `None` for discoverable flows.
    pub bound_user: Option<UserId>,
}

#[derive(Debug)]
struct IssuedChallenge<I> {
    value: [u8; CHALLENGE_SIZE],
    bound_user: Option<UserId>,
    issued_at: I,
}

/// Short-lived, single-use challenge store.
///
/// All checks and the removal happen under one lock, so a challenge can
/// never be consumed twice even by concurrent sessions.
///
/// Clones share state via `Arc`.
#[derive(Debug, Clone)]
pub struct ChallengeStore<E: Environment> {
    env: E,
    ttl: Duration,
    inner: Arc<Mutex<HashMap<ChallengeRef, IssuedChallenge<E::Instant>>>>,
}

impl<E: Environment> ChallengeStore<E> {
    /// Create a store with the given expiry window.
    pub fn new(env: E, ttl: Duration) -> Self {
        Self { env, ttl, inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Issue a fresh challenge, optionally bound to a known user.
    ///
    /// The returned reference is the server-side handle; the value inside
    /// [`Challenge`] is what the authenticator signs over.
    pub fn issue(&self, bound_user: Option<UserId>) -> (ChallengeRef, Challenge) {
        let challenge_ref = ChallengeRef::new(self.env.random_u128());
        let value = self.env.random_array();
        let issued = IssuedChallenge {
            value,
            bound_user: bound_user.clone(),
            issued_at: self.env.now(),
        };

        let Ok(mut inner) = self.inner.lock() else {
            // A poisoned lock means a panic mid-insert; the map may be
            // incomplete but never corrupt, so issuing fails closed by
            // returning an unconsumable challenge.
            return (challenge_ref, Challenge { value, bound_user });
        };
        inner.insert(challenge_ref, issued);
        drop(inner);

        (challenge_ref, Challenge { value, bound_user })
    }

    /// Consume a challenge: single-use take with expiry and binding checks.
    ///
    /// On success the challenge is deleted, so a second consumption attempt
    /// fails with [`CeremonyError::ChallengeNotFound`]. A mismatched value
    /// or bound-user also reports `ChallengeNotFound` - distinguishing those
    /// cases would tell a forger which part of its guess was right.
    pub fn consume(
        &self,
        challenge_ref: ChallengeRef,
        presented_value: &[u8],
        caller: Option<&UserId>,
    ) -> Result<Challenge, CeremonyError> {
        let now = self.env.now();
        let mut inner = self.inner.lock().map_err(|_| CeremonyError::ChallengeNotFound)?;

        // Remove unconditionally: every consumption attempt spends the
        // challenge, matching the at-most-once invariant.
        let issued = inner.remove(&challenge_ref).ok_or(CeremonyError::ChallengeNotFound)?;
        drop(inner);

        if now - issued.issued_at > self.ttl {
            return Err(CeremonyError::ChallengeExpired);
        }

        let presented: [u8; CHALLENGE_SIZE] =
            presented_value.try_into().map_err(|_| CeremonyError::ChallengeNotFound)?;
        if issued.value.as_slice().ct_eq(presented.as_slice()).unwrap_u8() != 1 {
            return Err(CeremonyError::ChallengeNotFound);
        }

        if let Some(bound) = &issued.bound_user {
            if caller != Some(bound) {
                return Err(CeremonyError::ChallengeNotFound);
            }
        }

        Ok(Challenge { value: issued.value, bound_user: issued.bound_user })
    }

    /// Discard an issued challenge without consuming it.
    ///
    /// Used when a ceremony is cancelled before the response arrives, so
    /// cancellation leaves nothing behind beyond its natural expiry.
    pub fn abandon(&self, challenge_ref: ChallengeRef) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.remove(&challenge_ref);
        }
    }

    /// Remove every expired challenge; returns how many were swept.
    pub fn purge_expired(&self) -> usize {
        let now = self.env.now();
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        let before = inner.len();
        inner.retain(|_, issued| now - issued.issued_at <= self.ttl);
        before - inner.len()
    }

    /// True if the reference names a live (issued, unconsumed) challenge.
    pub fn contains(&self, challenge_ref: ChallengeRef) -> bool {
        self.inner.lock().is_ok_and(|inner| inner.contains_key(&challenge_ref))
    }

    /// Number of live (issued, unconsumed) challenges.
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.len())
    }

    /// True if no challenges are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
