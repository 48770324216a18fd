//! Codec module - serialization of payloads.
//!
//! - [`JsonCodec`] - JSON using `serde_json`, the only payload format of
//!   wire encoding version 1.
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the payload format is fixed at compile time.

mod json;

pub use json::JsonCodec;
