//! Pre-wired simulation world.

use sealkey_app::SetupDriver;
use sealkey_core::{
    CeremonyCoordinator, CoordinatorConfig, MemoryStorage, RelyingParty, UserId,
};

use crate::{FakeAuthenticator, SimEnv, StubIdentity};

/// Origin the simulated relying party serves from.
pub const TEST_ORIGIN: &str = "https://app.example.com";

/// Everything a deterministic end-to-end test needs, wired together.
///
/// All handles share state: the coordinator sees the same storage a test
/// inspects directly, and drivers built from the same world share the
/// authenticator and identity provider.
#[derive(Debug, Clone)]
pub struct TestWorld {
    /// Virtual clock and seeded RNG driving the coordinator.
    pub env: SimEnv,
    /// Backing store, directly inspectable.
    pub storage: MemoryStorage,
    /// The coordinator under test.
    pub coordinator: CeremonyCoordinator<SimEnv, MemoryStorage>,
    /// Simulated hardware key.
    pub authenticator: FakeAuthenticator,
    /// Scriptable identity collaborator.
    pub identity: StubIdentity,
}

impl TestWorld {
    /// Build a world from an RNG seed.
    pub fn new(seed: u64) -> Self {
        let env = SimEnv::from_seed(seed);
        let storage = MemoryStorage::new();
        let coordinator = CeremonyCoordinator::new(
            env.clone(),
            Self::rp(),
            CoordinatorConfig::default(),
            storage.clone(),
        );
        Self {
            env,
            storage,
            coordinator,
            authenticator: FakeAuthenticator::new(seed.wrapping_add(1), TEST_ORIGIN),
            identity: StubIdentity::new(),
        }
    }

    /// The fixed relying party every world uses.
    pub fn rp() -> RelyingParty {
        RelyingParty::new("example.com", "Example", vec![TEST_ORIGIN.to_string()])
    }

    /// Sign an account in and return its id.
    pub fn sign_in(&self, name: &str) -> UserId {
        let user_id = UserId::new(name);
        self.identity.sign_in(&user_id, &format!("{name}@example.com"));
        user_id
    }

    /// A driver sharing this world's coordinator, authenticator, and
    /// identity provider.
    pub fn driver(&self) -> SetupDriver<SimEnv, MemoryStorage, FakeAuthenticator, StubIdentity> {
        SetupDriver::new(
            self.coordinator.clone(),
            self.authenticator.clone(),
            self.identity.clone(),
        )
    }

    /// A driver whose ceremonies run against a cloned device instead of
    /// this world's authenticator.
    pub fn driver_with_device(
        &self,
        device: FakeAuthenticator,
    ) -> SetupDriver<SimEnv, MemoryStorage, FakeAuthenticator, StubIdentity> {
        SetupDriver::new(self.coordinator.clone(), device, self.identity.clone())
    }
}
