//! Secure key-value storage for keychain-property.
//!
//! Items are addressed by an [`ItemKey`] (service + account) and written
//! under an [`AccessPolicy`]. Backends implement [`SecureStore`]:
//!
//! - [`MemoryStore`]: process-local map, used in tests and where no
//!   platform keychain exists
//! - [`FileSecureStore`]: AES-256-GCM encrypted records on disk
//! - `KeychainStore`: Security.framework generic passwords (Apple targets)
//!
//! Application code normally goes through a [`Keychain`] handle, which binds
//! a backend to one service identifier and one access policy.

pub mod crypto;
pub mod error;
pub mod file;
pub mod handle;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod keychain;
pub mod master_key;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use file::FileSecureStore;
pub use handle::Keychain;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use keychain::KeychainStore;
pub use memory::MemoryStore;
pub use store::SecureStore;
pub use types::{AccessPolicy, Accessibility, AuthenticationPolicy, ItemKey, SecretBytes};
