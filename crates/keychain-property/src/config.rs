//! Slot configuration.
//!
//! A [`SlotConfig`] fixes a slot's identity and modes for its whole
//! lifetime. It is usually built in code, but can also be loaded from a
//! JSON5 document:
//!
//! ```json5
//! {
//!   service_identifier: "com.example.app",
//!   value_key: "session_token",
//!   requires_biometry: true,
//!   cache_value: true,
//! }
//! ```

use std::fs;
use std::path::Path;

use keychain_property_store::{AccessPolicy, ItemKey};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identity and mode settings for a [`crate::SecureSlot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Service identifier of the store entry.
    #[serde(default = "default_service_identifier")]
    pub service_identifier: String,

    /// Key of the store entry within the service.
    pub value_key: String,

    /// Gate the entry on the current biometric set and serve repeat reads
    /// from memory once authenticated.
    #[serde(default)]
    pub requires_biometry: bool,

    /// Retain the latest value in memory and replay it to new subscribers.
    #[serde(default)]
    pub cache_value: bool,

    /// Emit a debug trace naming the key on every write.
    #[serde(default = "default_debug_trace")]
    pub debug_trace: bool,

    /// How many unreceived values a subscriber may fall behind by before
    /// older ones are skipped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Default service identifier: the running executable's name, or this
/// crate's name when that cannot be determined.
pub fn default_service_identifier() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

fn default_debug_trace() -> bool {
    cfg!(debug_assertions)
}

fn default_channel_capacity() -> usize {
    16
}

impl SlotConfig {
    /// Configuration for `value_key` under the default service identifier,
    /// with biometry and caching off.
    pub fn new(value_key: impl Into<String>) -> Self {
        Self {
            service_identifier: default_service_identifier(),
            value_key: value_key.into(),
            requires_biometry: false,
            cache_value: false,
            debug_trace: default_debug_trace(),
            channel_capacity: default_channel_capacity(),
        }
    }

    pub fn with_service(mut self, service_identifier: impl Into<String>) -> Self {
        self.service_identifier = service_identifier.into();
        self
    }

    pub fn requiring_biometry(mut self, requires_biometry: bool) -> Self {
        self.requires_biometry = requires_biometry;
        self
    }

    pub fn caching(mut self, cache_value: bool) -> Self {
        self.cache_value = cache_value;
        self
    }

    pub fn with_debug_trace(mut self, debug_trace: bool) -> Self {
        self.debug_trace = debug_trace;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a JSON5 document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.service_identifier.is_empty() {
            errors.push("service_identifier must not be empty".to_string());
        }
        if self.value_key.is_empty() {
            errors.push("value_key must not be empty".to_string());
        }
        if self.channel_capacity == 0 {
            errors.push("channel_capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Access policy for the slot's store entry.
    pub fn access_policy(&self) -> AccessPolicy {
        if self.requires_biometry {
            AccessPolicy::biometry_current_set()
        } else {
            AccessPolicy::device_passcode()
        }
    }

    /// Address of the slot's store entry.
    pub fn item_key(&self) -> Result<ItemKey, ConfigError> {
        ItemKey::new(self.service_identifier.as_str(), self.value_key.as_str())
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}
