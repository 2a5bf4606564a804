//! Encrypted file-system secure store.
//!
//! Each item is one JSON record at `{base_dir}/{service}/{account}.json`,
//! where both path components are the hex SHA-256 of the key half. Item
//! keys may hold any string; file names stay fixed-length, lowercase and
//! free of separators.
//! Payloads are sealed with [`crate::crypto`] under a master key resolved by
//! [`crate::master_key`]. Directories are created `0700` and records `0600`
//! on Unix; records are replaced atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, Sealed};
use crate::error::{Result, StoreError};
use crate::store::SecureStore;
use crate::types::{AccessPolicy, Accessibility, ItemKey, SecretBytes};

/// On-disk representation of a sealed item.
#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    /// `nonce || ciphertext || tag`, base64-encoded.
    encrypted_value: String,
    /// HKDF salt, hex-encoded.
    salt: String,
    accessibility: Accessibility,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A [`SecureStore`] that keeps sealed records on disk.
///
/// There is no way to present a biometric prompt from here, so writes under
/// a biometry-gated policy are refused with
/// [`StoreError::UnsupportedPolicy`].
pub struct FileSecureStore {
    base_dir: PathBuf,
    master_key: Zeroizing<Vec<u8>>,
}

impl FileSecureStore {
    /// Create a store rooted at `base_dir` using the provided master key.
    pub fn new(base_dir: impl Into<PathBuf>, master_key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            base_dir: base_dir.into(),
            master_key,
        }
    }

    /// Create a store under `~/.keychain-property/items` with the master key
    /// from [`crate::master_key::get_or_create_master_key`].
    pub fn from_default_dir() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            StoreError::Storage("could not determine home directory".to_string())
        })?;
        let master_key = crate::master_key::get_or_create_master_key()?;
        Ok(Self::new(
            home.join(".keychain-property").join("items"),
            master_key,
        ))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn service_dir(&self, item: &ItemKey) -> PathBuf {
        self.base_dir.join(path_component(item.service()))
    }

    /// Location of the record for `item`, whether or not it exists.
    pub fn item_path(&self, item: &ItemKey) -> PathBuf {
        self.service_dir(item)
            .join(format!("{}.json", path_component(item.account())))
    }

    fn read_record(&self, path: &Path) -> Result<Option<StoredItem>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

fn path_component(part: &str) -> String {
    hex::encode(Sha256::digest(part.as_bytes()))
}

/// Create `dir` (and parents) with mode 0700 on Unix.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Write `data` to `path` via a uniquely named temp file in the same
/// directory, with mode 0600 on Unix.
fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Storage(format!("no parent for {}", path.display())))?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl SecureStore for FileSecureStore {
    fn get(&self, item: &ItemKey, _policy: &AccessPolicy) -> Result<Option<SecretBytes>> {
        let path = self.item_path(item);
        let Some(stored) = self.read_record(&path)? else {
            return Ok(None);
        };

        let sealed = Sealed {
            ciphertext: STANDARD.decode(&stored.encrypted_value).map_err(|e| {
                StoreError::DecryptionFailed(format!("base64 decode failed: {e}"))
            })?,
            salt: hex::decode(&stored.salt)
                .map_err(|e| StoreError::DecryptionFailed(format!("hex decode failed: {e}")))?,
        };

        let plaintext = crypto::open(&self.master_key, &sealed, item.to_string().as_bytes())?;
        debug!(item = %item, "read sealed item");
        Ok(Some(SecretBytes::new(plaintext.as_slice())))
    }

    fn set(&self, item: &ItemKey, data: &[u8], policy: &AccessPolicy) -> Result<()> {
        if policy.requires_biometry() {
            return Err(StoreError::UnsupportedPolicy(
                "file store cannot gate items on biometry".to_string(),
            ));
        }

        let path = self.item_path(item);
        ensure_private_dir(&self.base_dir)?;
        ensure_private_dir(&self.service_dir(item))?;

        let now = Utc::now();
        let created_at = match self.read_record(&path) {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => now,
            Err(e) => {
                warn!(path = %path.display(), "replacing unreadable record: {e}");
                now
            }
        };

        let sealed = crypto::seal(&self.master_key, data, item.to_string().as_bytes())?;
        let stored = StoredItem {
            encrypted_value: STANDARD.encode(&sealed.ciphertext),
            salt: hex::encode(&sealed.salt),
            accessibility: policy.accessibility,
            created_at,
            updated_at: now,
        };

        let json = serde_json::to_string_pretty(&stored)?;
        debug!(item = %item, path = %path.display(), "writing sealed item");
        write_private_file(&path, json.as_bytes())
    }

    fn delete(&self, item: &ItemKey) -> Result<()> {
        let path = self.item_path(item);
        if !path.exists() {
            return Ok(());
        }
        debug!(item = %item, path = %path.display(), "deleting sealed item");
        fs::remove_file(&path)?;
        Ok(())
    }

    fn contains(&self, item: &ItemKey) -> Result<bool> {
        Ok(self.item_path(item).exists())
    }
}
