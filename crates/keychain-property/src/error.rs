//! Error types for keychain-property.

use keychain_property_store::StoreError;
use thiserror::Error;

/// Result alias for slot operations.
pub type Result<T> = std::result::Result<T, SlotError>;

/// Errors reported by the `try_` slot operations and by construction.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The value could not be encoded and the entry it should have replaced
    /// could not be deleted, so the previous value is still stored.
    #[error("Encoding failed ({codec}) and the stale entry was kept: {store}")]
    StaleEntry {
        codec: CodecError,
        store: StoreError,
    },
}

/// Slot configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON5 parse error: {0}")]
    Json5(String),
}

/// Value encoding and decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),
}

/// Non-blocking receive outcome when no value is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no value published since the last receive")]
    Empty,

    #[error("slot dropped")]
    Closed,
}
