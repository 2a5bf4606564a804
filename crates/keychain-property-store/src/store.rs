//! The secure store backend trait.

use crate::error::Result;
use crate::types::{AccessPolicy, ItemKey, SecretBytes};

/// Keyed blob storage with per-item access control.
///
/// Calls are synchronous: platform keychains block while they present an
/// authentication prompt, and callers decide where that may happen.
pub trait SecureStore: Send + Sync {
    /// Fetch an item. An absent item is `Ok(None)`; a denied or cancelled
    /// authentication prompt is [`StoreError::AuthenticationFailed`].
    ///
    /// [`StoreError::AuthenticationFailed`]: crate::StoreError::AuthenticationFailed
    fn get(&self, item: &ItemKey, policy: &AccessPolicy) -> Result<Option<SecretBytes>>;

    /// Insert or replace an item, applying `policy` to the stored entry.
    fn set(&self, item: &ItemKey, data: &[u8], policy: &AccessPolicy) -> Result<()>;

    /// Delete an item. Deleting an absent item succeeds.
    fn delete(&self, item: &ItemKey) -> Result<()>;

    /// Check whether an item exists. Backends skip decrypting the payload
    /// where they can.
    fn contains(&self, item: &ItemKey) -> Result<bool>;
}
