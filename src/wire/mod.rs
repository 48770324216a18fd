//! Wire module - framing of a details/params pair into one byte stream.
//!
//! Message layout (version 1):
//! ```text
//! <version>,<detailsLen>,<paramsLen>:<detailsBytes><paramsBytes>
//! ```
//!
//! - `version` is the encoding version; only `1` (JSON) is defined.
//! - Lengths are decimal byte counts of the serialized segments.
//! - There is no delimiter or escaping inside the payload region; the
//!   declared lengths are the only framing.

mod async_decode;
mod decode;
mod encode;

use std::fmt;

pub use async_decode::AsyncDecoder;
pub use decode::{DecodeError, DecodeLimits, DecodeResult, Decoder};
pub use encode::{encode, encode_with_json_params, EncodeError};

/// Terminator of the info header.
pub const HEADER_TERMINATOR: u8 = b':';

/// Separator between info header fields.
pub const HEADER_SEPARATOR: char = ',';

/// Default maximum info header length in bytes, including the terminator.
pub const DEFAULT_MAX_HEADER_LEN: usize = 250;

/// Default maximum size of a single segment (1 GiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u64 = 1 << 30;

/// Wire encoding version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Both segments are JSON.
    Json = 1,
}

/// Encoding used by [`encode`].
pub const DEFAULT_ENCODING: Encoding = Encoding::Json;

impl Encoding {
    /// Numeric version written in the info header.
    #[inline]
    pub fn version(self) -> i64 {
        self as i64
    }

    /// Look up an encoding by its header version.
    pub fn from_version(version: i64) -> Option<Self> {
        match version {
            1 => Some(Encoding::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version())
    }
}
