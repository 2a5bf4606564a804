//! Platform keychain backend (Security.framework generic passwords).
//!
//! Items map onto generic-password entries: the item service becomes
//! `kSecAttrService`, the account becomes `kSecAttrAccount`. The access
//! policy becomes a `SecAccessControl` attached on write; reading a
//! biometry-gated entry blocks while the system presents its prompt.

use security_framework::access_control::{ProtectionMode, SecAccessControl};
use security_framework::base::Error as SecError;
use security_framework::passwords::{
    delete_generic_password_options, generic_password, set_generic_password_options,
};
use security_framework::passwords_options::{AccessControlOptions, PasswordOptions};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::SecureStore;
use crate::types::{AccessPolicy, Accessibility, AuthenticationPolicy, ItemKey, SecretBytes};

const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
const ERR_SEC_USER_CANCELED: i32 = -128;
const ERR_SEC_AUTH_FAILED: i32 = -25293;
const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;

/// A [`SecureStore`] backed by the user's keychain.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

impl KeychainStore {
    pub fn new() -> Self {
        Self
    }
}

fn protection_mode(accessibility: Accessibility) -> ProtectionMode {
    match accessibility {
        Accessibility::WhenPasscodeSetThisDeviceOnly => {
            ProtectionMode::AccessibleWhenPasscodeSetThisDeviceOnly
        }
        Accessibility::WhenUnlockedThisDeviceOnly => {
            ProtectionMode::AccessibleWhenUnlockedThisDeviceOnly
        }
        Accessibility::AfterFirstUnlockThisDeviceOnly => {
            ProtectionMode::AccessibleAfterFirstUnlockThisDeviceOnly
        }
    }
}

fn access_control(policy: &AccessPolicy) -> Result<SecAccessControl> {
    let flags = match policy.authentication {
        Some(AuthenticationPolicy::BiometryCurrentSet) => {
            AccessControlOptions::BIOMETRY_CURRENT_SET.bits()
        }
        None => 0,
    };
    SecAccessControl::create_with_protection(Some(protection_mode(policy.accessibility)), flags)
        .map_err(|e| StoreError::Keychain(format!("access control creation failed: {e}")))
}

fn options(item: &ItemKey) -> PasswordOptions {
    PasswordOptions::new_generic_password(item.service(), item.account())
}

fn map_error(action: &str, e: SecError) -> StoreError {
    match e.code() {
        ERR_SEC_USER_CANCELED | ERR_SEC_AUTH_FAILED | ERR_SEC_INTERACTION_NOT_ALLOWED => {
            StoreError::AuthenticationFailed
        }
        _ => StoreError::Keychain(format!("keychain {action} failed: {e}")),
    }
}

impl SecureStore for KeychainStore {
    fn get(&self, item: &ItemKey, _policy: &AccessPolicy) -> Result<Option<SecretBytes>> {
        match generic_password(options(item)) {
            Ok(data) => Ok(Some(SecretBytes::new(data))),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(map_error("read", e)),
        }
    }

    fn set(&self, item: &ItemKey, data: &[u8], policy: &AccessPolicy) -> Result<()> {
        // Access control cannot be changed on an existing item, so replace it.
        self.delete(item)?;

        let mut opts = options(item);
        opts.set_access_control(access_control(policy)?);
        debug!(item = %item, biometry = policy.requires_biometry(), "writing keychain item");
        set_generic_password_options(data, opts).map_err(|e| map_error("write", e))
    }

    fn delete(&self, item: &ItemKey) -> Result<()> {
        match delete_generic_password_options(options(item)) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(()),
            Err(e) => Err(map_error("delete", e)),
        }
    }

    fn contains(&self, item: &ItemKey) -> Result<bool> {
        // The generic-password API has no attribute-only lookup, so this may
        // prompt for biometry-gated items.
        match generic_password(options(item)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(false),
            Err(e) if e.code() == ERR_SEC_INTERACTION_NOT_ALLOWED => Ok(true),
            Err(e) if e.code() == ERR_SEC_USER_CANCELED => Ok(true),
            Err(e) => Err(map_error("lookup", e)),
        }
    }
}
