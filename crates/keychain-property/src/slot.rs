//! The secured typed slot.

use std::fmt;
use std::sync::Arc;

use keychain_property_store::{ItemKey, Keychain, SecureStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, Span};
use zeroize::Zeroizing;

use crate::channel::{Subscription, ValueChannel};
use crate::codec::{Codec, JsonCodec};
use crate::config::SlotConfig;
use crate::error::{Result, SlotError};

/// Builder for a [`SecureSlot`] with a non-default codec or a diagnostic span.
pub struct SlotBuilder<C = JsonCodec> {
    config: SlotConfig,
    codec: C,
    diagnostics: Option<Span>,
}

impl SlotBuilder<JsonCodec> {
    pub fn new(config: SlotConfig) -> Self {
        Self {
            config,
            codec: JsonCodec,
            diagnostics: None,
        }
    }
}

impl<C: Codec> SlotBuilder<C> {
    /// Use `codec` instead of JSON for the stored representation.
    pub fn codec<D: Codec>(self, codec: D) -> SlotBuilder<D> {
        SlotBuilder {
            config: self.config,
            codec,
            diagnostics: self.diagnostics,
        }
    }

    /// Emit the slot's debug events as children of `span`. Without a span
    /// the slot emits nothing of its own.
    pub fn diagnostics(mut self, span: Span) -> Self {
        self.diagnostics = Some(span);
        self
    }

    /// Validate the configuration and open the slot on `store`.
    ///
    /// With caching on and biometry off, the current entry is read
    /// immediately so replay subscribers get it without an explicit read.
    /// With biometry on, the store is not touched until the first access.
    pub fn open<T>(self, store: Arc<dyn SecureStore>) -> Result<SecureSlot<T, C>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
    {
        let config = self.config;
        config.validate()?;
        let item = config.item_key()?;

        let keychain = Keychain::new(store, config.service_identifier.as_str())
            .with_policy(config.access_policy());
        let channel = ValueChannel::new(config.cache_value, config.channel_capacity);

        let slot = SecureSlot {
            config,
            item,
            keychain,
            codec: self.codec,
            channel,
            diagnostics: self.diagnostics,
        };

        if slot.config.cache_value && !slot.config.requires_biometry {
            let seeded = slot.get();
            slot.trace(if seeded.is_some() {
                "seeded cache from store"
            } else {
                "no stored value to seed cache"
            });
        }

        Ok(slot)
    }
}

/// A typed value persisted in a secure store entry.
///
/// `get` and `set` never fail: anything that goes wrong reads as absent, or
/// clears the entry on write. Every `set` publishes the written value to
/// subscribers, whether or not the store accepted it.
pub struct SecureSlot<T, C = JsonCodec> {
    config: SlotConfig,
    item: ItemKey,
    keychain: Keychain,
    codec: C,
    channel: ValueChannel<T>,
    diagnostics: Option<Span>,
}

impl SecureSlot<(), JsonCodec> {
    /// Start building a slot.
    pub fn builder(config: SlotConfig) -> SlotBuilder<JsonCodec> {
        SlotBuilder::new(config)
    }
}

impl<T> SecureSlot<T, JsonCodec>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Open a JSON-encoded slot without diagnostics.
    pub fn open(config: SlotConfig, store: Arc<dyn SecureStore>) -> Result<Self> {
        SlotBuilder::new(config).open(store)
    }
}

impl<T, C> SecureSlot<T, C>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
    C: Codec,
{
    /// Current value, or `None` if absent or unreadable.
    pub fn get(&self) -> Option<T> {
        self.try_get().unwrap_or_else(|e| {
            self.trace(&format!("read failed, treating as absent: {e}"));
            None
        })
    }

    /// Current value, reporting fetch, authentication and decode failures.
    pub fn try_get(&self) -> Result<Option<T>> {
        // Once authenticated, serve biometry-gated reads from memory so the
        // user is not prompted on every access.
        if self.config.requires_biometry {
            if let Some(value) = self.channel.latest() {
                self.trace("returning cached value");
                return Ok(Some(value));
            }
        }

        let value = match self.keychain.get(&self.config.value_key)? {
            Some(bytes) => Some(self.codec.decode::<T>(bytes.expose())?),
            None => None,
        };

        self.channel.remember(value.clone());
        Ok(value)
    }

    /// Store `value`, or delete the entry for `None`, then publish it.
    pub fn set(&self, value: Option<T>) {
        if let Err(e) = self.try_set(value) {
            self.trace(&format!("write failed: {e}"));
        }
    }

    /// Delete the entry and publish absence.
    pub fn clear(&self) {
        self.set(None);
    }

    /// Like [`set`](Self::set), reporting what went wrong.
    ///
    /// A value that fails to encode clears the entry instead; if that delete
    /// fails too the error is [`SlotError::StaleEntry`]. The value is
    /// published in every case, before the error is returned.
    pub fn try_set(&self, value: Option<T>) -> Result<()> {
        if self.config.debug_trace {
            self.trace(&format!(
                "setting new value for key \"{}\"",
                self.config.value_key
            ));
        }

        let result = match &value {
            Some(v) => match self.codec.encode(v) {
                Ok(bytes) => {
                    let bytes = Zeroizing::new(bytes);
                    self.keychain
                        .set(&self.config.value_key, &bytes)
                        .map_err(SlotError::from)
                }
                Err(codec) => match self.keychain.remove(&self.config.value_key) {
                    Ok(()) => Err(SlotError::from(codec)),
                    Err(store) => Err(SlotError::StaleEntry { codec, store }),
                },
            },
            None => self
                .keychain
                .remove(&self.config.value_key)
                .map_err(SlotError::from),
        };

        self.channel.publish(value);
        result
    }

    /// Subscribe to published values. In caching mode the latest value is
    /// delivered first.
    pub fn subscribe(&self) -> Subscription<T> {
        self.channel.subscribe()
    }

    /// The in-memory cached value, without touching the store.
    pub fn cached(&self) -> Option<T> {
        self.channel.latest()
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    pub fn item_key(&self) -> &ItemKey {
        &self.item
    }

    fn trace(&self, message: &str) {
        if let Some(span) = &self.diagnostics {
            debug!(parent: span, item = %self.item, "{message}");
        }
    }
}

impl<T, C> fmt::Debug for SecureSlot<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSlot")
            .field("item", &format_args!("{}", self.item))
            .field("requires_biometry", &self.config.requires_biometry)
            .field("cache_value", &self.config.cache_value)
            .finish_non_exhaustive()
    }
}
