//! Environment abstraction for deterministic testing.
//!
//! Decouples ceremony logic from system resources (time, randomness). The
//! harness substitutes a virtual clock and seeded RNG so challenge expiry and
//! salt generation are fully reproducible; production uses [`SystemEnv`].

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context. Subsequent calls must return times >= previous
    ///   calls.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Used only for audit timestamps on durable records (`created_at`,
    /// `last_used_at`); never for expiry decisions, which use [`now`].
    ///
    /// [`now`]: Environment::now
    fn unix_millis(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be
    /// used by driver code (not ceremony logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u128`.
    ///
    /// Convenience for opaque handles like challenge references.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }

    /// Generates a random 32-byte array.
    ///
    /// Convenience for challenge values and PRF salts.
    fn random_array(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Production environment backed by the OS clock and entropy source.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let Ok(()) = getrandom::fill(buffer) else {
            unreachable!("OS entropy source failed");
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_is_monotonic() {
        let env = SystemEnv::new();
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }

    #[test]
    fn random_arrays_differ() {
        let env = SystemEnv::new();
        // Two CSPRNG draws colliding would be a 2^-256 event
        assert_ne!(env.random_array(), env.random_array());
    }

    #[test]
    fn random_u128_uses_full_width() {
        let env = SystemEnv::new();
        // Four draws all fitting in 64 bits would mean the top half is dead
        let any_high = (0..4).any(|_| env.random_u128() >> 64 != 0);
        assert!(any_high);
    }
}
