//! Core types shared by every store backend.
//!
//! An item is addressed by [`ItemKey`] and protected by an [`AccessPolicy`].
//! Item payloads travel as [`SecretBytes`], which are zeroed on drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, StoreError};

/// Address of one entry in a secure store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    service: String,
    account: String,
}

impl ItemKey {
    /// Create an item key. Both halves may be any non-empty string.
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Result<Self> {
        let service = service.into();
        let account = account.into();
        validate_part("service", &service)?;
        validate_part("account", &account)?;
        Ok(Self { service, account })
    }

    /// Service identifier (usually the application's bundle or package id).
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Account (value key) within the service.
    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.account)
    }
}

fn validate_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidKey(format!("{what} must not be empty")));
    }
    Ok(())
}

/// When an item may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Only while unlocked, only on this device, only if a passcode is set.
    /// Removing the passcode destroys the item.
    #[default]
    WhenPasscodeSetThisDeviceOnly,

    /// Only while unlocked, only on this device.
    WhenUnlockedThisDeviceOnly,

    /// After the first unlock since boot, only on this device.
    AfterFirstUnlockThisDeviceOnly,
}

/// Extra user-presence requirement on top of [`Accessibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationPolicy {
    /// Requires a currently enrolled biometric. Enrolling or removing a
    /// biometric invalidates the item.
    BiometryCurrentSet,
}

/// Access-control policy applied to an item when it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub accessibility: Accessibility,
    pub authentication: Option<AuthenticationPolicy>,
}

impl AccessPolicy {
    /// Device-bound, passcode-required.
    pub fn device_passcode() -> Self {
        Self {
            accessibility: Accessibility::WhenPasscodeSetThisDeviceOnly,
            authentication: None,
        }
    }

    /// Device-bound, passcode-required, and gated on the current biometric set.
    pub fn biometry_current_set() -> Self {
        Self {
            accessibility: Accessibility::WhenPasscodeSetThisDeviceOnly,
            authentication: Some(AuthenticationPolicy::BiometryCurrentSet),
        }
    }

    /// Whether reading the item triggers a biometric prompt.
    pub fn requires_biometry(&self) -> bool {
        matches!(
            self.authentication,
            Some(AuthenticationPolicy::BiometryCurrentSet)
        )
    }
}

/// An item payload held in memory.
///
/// Zeroed on drop. Debug emits `[REDACTED]` so payloads never reach logs.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    inner: Vec<u8>,
}

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    /// Expose the raw payload. Use sparingly.
    pub fn expose(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}
