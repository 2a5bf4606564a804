//! Error types for secure store operations.

use thiserror::Error;

/// Errors that can occur while talking to a secure store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Authentication failed or was cancelled")]
    AuthenticationFailed,

    #[error("Access policy not supported by this backend: {0}")]
    UnsupportedPolicy(String),

    #[error("Invalid item key: {0}")]
    InvalidKey(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
