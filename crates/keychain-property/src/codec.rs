//! Value encoding for stored entries.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Turns slot values into stored bytes and back.
///
/// Implementations must round-trip: `decode(encode(v)) == v`.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Stores values as compact JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
