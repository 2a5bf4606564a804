//! # keychain-property
//!
//! Typed secret values persisted in a secure store.
//!
//! A [`SecureSlot`] binds one store entry (service identifier + value key) to
//! a value type `T`. Reads decode the entry, writes encode it, and every
//! write is republished to subscribers of the slot's [`ValueChannel`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use keychain_property::{SecureSlot, SlotConfig};
//! use keychain_property_store::MemoryStore;
//!
//! let config = SlotConfig::new("session_token").with_service("com.example.app");
//! let slot: SecureSlot<String> = SecureSlot::open(config, Arc::new(MemoryStore::new()))?;
//!
//! slot.set(Some("abc".to_string()));
//! assert_eq!(slot.get().as_deref(), Some("abc"));
//! ```
//!
//! Failures never reach `get`/`set`: a value that cannot be fetched or
//! decoded reads as absent, and a write that cannot be encoded clears the
//! entry. [`SecureSlot::try_get`] and [`SecureSlot::try_set`] report what
//! went wrong for callers that need to know.

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod slot;

pub use channel::{Subscription, ValueChannel};
pub use codec::{Codec, JsonCodec};
pub use config::SlotConfig;
pub use error::{CodecError, ConfigError, Result, SlotError, TryRecvError};
pub use slot::{SecureSlot, SlotBuilder};

pub use keychain_property_store as store;
