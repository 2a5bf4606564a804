//! Master key resolution for the encrypted file backend.
//!
//! The key is resolved in priority order:
//! 1. `KEYCHAIN_PROPERTY_MASTER_KEY` environment variable (hex-encoded)
//! 2. An entry in a platform secure store
//! 3. Generate a new key and persist it to that store
//!
//! Without a platform store (anything but Apple targets) only the
//! environment variable survives a restart.

use tracing::debug;
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
use tracing::warn;
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_SIZE};
use crate::error::{Result, StoreError};
use crate::store::SecureStore;
use crate::types::{AccessPolicy, ItemKey};

/// Service name under which the master key itself is stored.
pub const MASTER_KEY_SERVICE: &str = "keychain-property";
const MASTER_KEY_ACCOUNT: &str = "master_key";

/// Environment variable name for the master key (hex-encoded).
pub const ENV_VAR: &str = "KEYCHAIN_PROPERTY_MASTER_KEY";

fn master_key_item() -> Result<ItemKey> {
    ItemKey::new(MASTER_KEY_SERVICE, MASTER_KEY_ACCOUNT)
}

fn decode_hex_key(source: &str, hex_key: &str) -> Result<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(
        hex::decode(hex_key.trim())
            .map_err(|e| StoreError::Keychain(format!("invalid hex in {source}: {e}")))?,
    );
    if key.len() != KEY_SIZE {
        return Err(StoreError::Keychain(format!(
            "{source} must decode to exactly {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    Ok(key)
}

fn from_env() -> Result<Option<Zeroizing<Vec<u8>>>> {
    match std::env::var(ENV_VAR) {
        Ok(hex_key) => {
            debug!("using master key from environment variable");
            decode_hex_key(ENV_VAR, &hex_key).map(Some)
        }
        Err(_) => Ok(None),
    }
}

/// Resolve the master key using `platform` as the persistent home for it.
pub fn get_or_create_master_key_in(platform: &dyn SecureStore) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(key) = from_env()? {
        return Ok(key);
    }

    let item = master_key_item()?;
    let policy = AccessPolicy::device_passcode();

    if let Some(stored) = platform.get(&item, &policy)? {
        debug!("using master key from secure store");
        let hex_str = std::str::from_utf8(stored.expose()).map_err(|e| {
            StoreError::Keychain(format!("stored master key is not valid UTF-8: {e}"))
        })?;
        return decode_hex_key("stored master key", hex_str);
    }

    debug!("generating new master key and storing it");
    let key = crypto::generate_master_key();
    let hex_key = Zeroizing::new(hex::encode(key.as_slice()));
    platform.set(&item, hex_key.as_bytes(), &policy)?;
    Ok(key)
}

/// Resolve the master key using the platform keychain where one exists.
pub fn get_or_create_master_key() -> Result<Zeroizing<Vec<u8>>> {
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        get_or_create_master_key_in(&crate::keychain::KeychainStore::new())
    }

    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    {
        if let Some(key) = from_env()? {
            return Ok(key);
        }
        let key = crypto::generate_master_key();
        warn!(
            "no platform keychain on this target; master key cannot be persisted. \
             Set {ENV_VAR} to a hex-encoded 32-byte key to reuse encrypted items across runs"
        );
        Ok(key)
    }
}

/// Delete a persisted master key (for reset workflows).
pub fn delete_master_key_in(platform: &dyn SecureStore) -> Result<()> {
    platform.delete(&master_key_item()?)
}
