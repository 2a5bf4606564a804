//! AES-256-GCM item sealing with HKDF-SHA256 key derivation.
//!
//! Every sealed item gets its own random salt, so the master key never
//! touches a cipher directly. The item's address is bound in as associated
//! data: a record copied onto another item fails authentication.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};

const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 32;
pub const KEY_SIZE: usize = 32;

/// HKDF info string used to domain-separate derived keys.
const HKDF_INFO: &[u8] = b"keychain-property-item-v1";

/// Output of [`seal`].
#[derive(Debug, Clone)]
pub struct Sealed {
    /// `nonce || ciphertext || tag`
    pub ciphertext: Vec<u8>,
    pub salt: Vec<u8>,
}

fn derive_key(master_key: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| StoreError::EncryptionFailed(format!("key derivation failed: {e}")))?;
    Ok(okm)
}

/// Encrypt `plaintext` for the item identified by `aad`.
pub fn seal(master_key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let mut salt = vec![0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = derive_key(master_key, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| StoreError::EncryptionFailed(e.to_string()))?;

    let body = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| StoreError::EncryptionFailed(e.to_string()))?;

    let mut ciphertext = Vec::with_capacity(NONCE_SIZE + body.len());
    ciphertext.extend_from_slice(&nonce_bytes);
    ciphertext.extend_from_slice(&body);

    Ok(Sealed { ciphertext, salt })
}

/// Decrypt a record produced by [`seal`] with the same `aad`.
pub fn open(master_key: &[u8], sealed: &Sealed, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.ciphertext.len() < NONCE_SIZE {
        return Err(StoreError::DecryptionFailed(
            "ciphertext too short".to_string(),
        ));
    }

    let (nonce_bytes, body) = sealed.ciphertext.split_at(NONCE_SIZE);

    let key = derive_key(master_key, &sealed.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| StoreError::DecryptionFailed(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: body, aad })
        .map(Zeroizing::new)
        .map_err(|e| StoreError::DecryptionFailed(e.to_string()))
}

/// Generate a new random 256-bit master key.
pub fn generate_master_key() -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; KEY_SIZE]);
    rand::thread_rng().fill_bytes(key.as_mut_slice());
    key
}
