//! JSON codec using `serde_json`.
//!
//! Both wire segments (details and params) and handler parameters go through
//! this codec, so the wire format and handler invocation always agree on the
//! payload format.
//!
//! # Example
//!
//! ```
//! use hoist::codec::JsonCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let msg = Message { id: 42, content: "hello".to_string() };
//! let encoded = JsonCodec::encode(&msg).unwrap();
//! assert_eq!(encoded, br#"{"id":42,"content":"hello"}"#);
//! let decoded: Message = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// JSON codec for structured payloads.
///
/// Output is compact UTF-8 JSON with no trailing newline; lengths written on
/// the wire are byte counts of exactly this output.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be represented as JSON
    /// (e.g. a map with non-string keys).
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(value)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not valid JSON for type `T`.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
        serde_json::from_slice(bytes)
    }

    /// Convert a value to a JSON tree without producing bytes.
    ///
    /// # Errors
    ///
    /// Same conditions as [`JsonCodec::encode`].
    #[inline]
    pub fn to_value<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Value> {
        serde_json::to_value(value)
    }
}
