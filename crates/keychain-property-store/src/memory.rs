//! In-process secure store.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::Result;
use crate::store::SecureStore;
use crate::types::{AccessPolicy, ItemKey, SecretBytes};

struct Entry {
    data: SecretBytes,
    policy: AccessPolicy,
}

/// A [`SecureStore`] that keeps items in memory for the life of the process.
///
/// The access policy is recorded with each entry but never enforced: there
/// is no device passcode or biometric prompt to consult.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<ItemKey, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Policy an item was last written with.
    pub fn policy_of(&self, item: &ItemKey) -> Option<AccessPolicy> {
        self.entries.lock().get(item).map(|e| e.policy)
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, item: &ItemKey, _policy: &AccessPolicy) -> Result<Option<SecretBytes>> {
        Ok(self.entries.lock().get(item).map(|e| e.data.clone()))
    }

    fn set(&self, item: &ItemKey, data: &[u8], policy: &AccessPolicy) -> Result<()> {
        self.entries.lock().insert(
            item.clone(),
            Entry {
                data: SecretBytes::from(data),
                policy: *policy,
            },
        );
        Ok(())
    }

    fn delete(&self, item: &ItemKey) -> Result<()> {
        self.entries.lock().remove(item);
        Ok(())
    }

    fn contains(&self, item: &ItemKey) -> Result<bool> {
        Ok(self.entries.lock().contains_key(item))
    }
}
