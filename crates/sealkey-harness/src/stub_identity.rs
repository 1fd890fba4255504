//! Scriptable identity collaborator.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sealkey_core::{AccountInfo, HandoffLink, IdentityError, IdentityProvider, UserId};

#[derive(Debug, Default)]
struct Inner {
    current: Option<AccountInfo>,
    accounts: HashMap<String, UserId>,
    fail_lookups: bool,
    fail_handoff: bool,
}

/// In-memory [`IdentityProvider`] for tests.
///
/// Clones share state, so a test can flip failure switches on its handle
/// while the driver holds another.
#[derive(Debug, Clone, Default)]
pub struct StubIdentity {
    inner: Arc<Mutex<Inner>>,
}

impl StubIdentity {
    /// Create an empty provider with no signed-in user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and mark it as the signed-in user.
    pub fn sign_in(&self, user_id: &UserId, email: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.accounts.insert(email.to_string(), user_id.clone());
            inner.current =
                Some(AccountInfo { user_id: user_id.clone(), email: email.to_string() });
        }
    }

    /// Clear the signed-in user; known accounts remain resolvable.
    pub fn sign_out(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.current = None;
        }
    }

    /// Make email lookups fail with [`IdentityError::Unavailable`].
    pub fn fail_lookups(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_lookups = fail;
        }
    }

    /// Make handoff minting fail with [`IdentityError::Unavailable`].
    pub fn fail_handoff(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_handoff = fail;
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn current_user(&self) -> Option<AccountInfo> {
        self.inner.lock().ok().and_then(|inner| inner.current.clone())
    }

    async fn user_id_for_email(&self, email: &str) -> Result<Option<UserId>, IdentityError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| IdentityError::Unavailable("lock poisoned".to_string()))?;
        if inner.fail_lookups {
            return Err(IdentityError::Unavailable("lookups disabled".to_string()));
        }
        Ok(inner.accounts.get(email).cloned())
    }

    async fn login_handoff(&self, user_id: &UserId) -> Result<HandoffLink, IdentityError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| IdentityError::Unavailable("lock poisoned".to_string()))?;
        if inner.fail_handoff {
            return Err(IdentityError::Unavailable("handoff disabled".to_string()));
        }
        Ok(HandoffLink::new(format!("sealkey://handoff/{user_id}")))
    }
}
