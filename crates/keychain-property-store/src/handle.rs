//! Policy-bound access to one service in a secure store.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::store::SecureStore;
use crate::types::{AccessPolicy, ItemKey, SecretBytes};

/// A handle onto one service identifier of a [`SecureStore`], carrying the
/// access policy every write through it receives.
///
/// ```ignore
/// let keychain = Keychain::new(store, "com.example.app")
///     .with_policy(AccessPolicy::biometry_current_set());
/// keychain.set("token", b"...")?;
/// ```
#[derive(Clone)]
pub struct Keychain {
    backend: Arc<dyn SecureStore>,
    service: String,
    policy: AccessPolicy,
}

impl Keychain {
    /// Create a handle with the default device-bound, passcode-required policy.
    pub fn new(backend: Arc<dyn SecureStore>, service: impl Into<String>) -> Self {
        Self {
            backend,
            service: service.into(),
            policy: AccessPolicy::device_passcode(),
        }
    }

    /// Replace the access policy.
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Build the full item key for `account` under this handle's service.
    pub fn item(&self, account: &str) -> Result<ItemKey> {
        ItemKey::new(self.service.as_str(), account)
    }

    pub fn get(&self, account: &str) -> Result<Option<SecretBytes>> {
        let item = self.item(account)?;
        self.backend.get(&item, &self.policy)
    }

    pub fn set(&self, account: &str, data: &[u8]) -> Result<()> {
        let item = self.item(account)?;
        self.backend.set(&item, data, &self.policy)
    }

    pub fn remove(&self, account: &str) -> Result<()> {
        let item = self.item(account)?;
        self.backend.delete(&item)
    }

    pub fn contains(&self, account: &str) -> Result<bool> {
        let item = self.item(account)?;
        self.backend.contains(&item)
    }
}

impl fmt::Debug for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keychain")
            .field("service", &self.service)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
