//! Message decoding from a blocking byte stream.
//!
//! # Example
//!
//! ```
//! use hoist::wire::{Decoder, Encoding};
//!
//! let input = br#"1,17,19:{"service":"abc"}{"message":"hello"}"#;
//! let mut decoder = Decoder::new(&input[..]);
//!
//! let decoded = decoder.decode().unwrap();
//! assert_eq!(decoded.encoding, Encoding::Json);
//! assert_eq!(&decoded.raw_details[..], br#"{"service":"abc"}"#);
//! assert_eq!(&decoded.raw_params[..], br#"{"message":"hello"}"#);
//! ```

use std::io::{self, BufRead, BufReader, Read};

use bytes::Bytes;
use thiserror::Error;

use super::{
    Encoding, DEFAULT_MAX_HEADER_LEN, DEFAULT_MAX_PAYLOAD_LEN, HEADER_SEPARATOR,
    HEADER_TERMINATOR,
};
use crate::error::Kind;

/// Upper bound on up-front allocation for a segment; larger segments grow
/// as bytes actually arrive.
pub(super) const SEGMENT_PREALLOC: u64 = 64 * 1024;

/// Failure to decode a message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No `:`-terminated header before end of stream or a read error.
    #[error("unable to read info header")]
    ReadHeader(#[source] io::Error),

    /// A header field is not a base-10 integer.
    #[error("'{part}' is not an int in info header")]
    HeaderNotInt { part: String },

    /// The header has no fields.
    #[error("info header must contain the encoding version")]
    MissingVersion,

    /// The first header field names an unknown encoding.
    #[error("encoding version '{version}' not implemented")]
    UnsupportedVersion { version: i64 },

    /// Version 1 header without exactly (version, details length, params length).
    #[error(
        "requires exactly three info header parts (version, details length, params length) \
         got '{header:?}'"
    )]
    MalformedHeader { header: Vec<i64> },

    /// The header did not terminate within the configured limit.
    #[error("info header exceeds {limit} bytes")]
    HeaderTooLong { limit: usize },

    /// A declared segment length exceeds the configured limit.
    #[error("declared segment of {declared} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { declared: u64, limit: u64 },

    /// Fewer than the declared details bytes could be read.
    #[error("unable to read details")]
    ReadDetails(#[source] io::Error),

    /// Fewer than the declared params bytes could be read.
    #[error("unable to read params")]
    ReadParams(#[source] io::Error),
}

impl Kind for DecodeError {
    fn kind(&self) -> &'static str {
        match self {
            DecodeError::ReadHeader(_)
            | DecodeError::ReadDetails(_)
            | DecodeError::ReadParams(_) => "unable_to_read",
            DecodeError::HeaderNotInt { .. }
            | DecodeError::MissingVersion
            | DecodeError::UnsupportedVersion { .. }
            | DecodeError::HeaderTooLong { .. } => "header_invalid",
            DecodeError::MalformedHeader { .. } | DecodeError::PayloadTooLarge { .. } => {
                "encoding_invalid"
            }
        }
    }
}

/// The two segments of one decoded message, un-interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    /// Encoding declared in the header.
    pub encoding: Encoding,
    /// Exactly the declared details bytes.
    pub raw_details: Bytes,
    /// Exactly the declared params bytes.
    pub raw_params: Bytes,
}

/// Bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum header length in bytes, including the `:` terminator.
    pub max_header_len: usize,
    /// Maximum declared length of each segment.
    pub max_payload_len: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_header_len: DEFAULT_MAX_HEADER_LEN,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

/// Streaming decoder over a blocking reader.
///
/// Each [`decode`](Decoder::decode) call consumes exactly one message: the
/// header and the declared number of bytes, nothing more. Calling it again
/// decodes the next message on the same stream.
pub struct Decoder<R> {
    reader: BufReader<R>,
    limits: DecodeLimits,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder with default limits.
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, DecodeLimits::default())
    }

    /// Create a decoder with custom limits.
    pub fn with_limits(reader: R, limits: DecodeLimits) -> Self {
        Self {
            reader: BufReader::new(reader),
            limits,
        }
    }

    /// Decode the next message on the stream.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`] for each failure mode.
    pub fn decode(&mut self) -> Result<DecodeResult, DecodeError> {
        let mut raw_header = Vec::new();
        (&mut self.reader)
            .take(self.limits.max_header_len as u64)
            .read_until(HEADER_TERMINATOR, &mut raw_header)
            .map_err(DecodeError::ReadHeader)?;

        let at_eof = raw_header.last() != Some(&HEADER_TERMINATOR)
            && self
                .reader
                .fill_buf()
                .map_err(DecodeError::ReadHeader)?
                .is_empty();

        let (encoding, details_len, params_len) =
            parse_header(&raw_header, at_eof, &self.limits)?;

        let raw_details =
            read_segment(&mut self.reader, details_len).map_err(DecodeError::ReadDetails)?;
        let raw_params =
            read_segment(&mut self.reader, params_len).map_err(DecodeError::ReadParams)?;

        Ok(DecodeResult {
            encoding,
            raw_details,
            raw_params,
        })
    }

    /// Unwrap the decoder, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

/// Validate a raw header (as read up to and including `:`) and return the
/// encoding with both segment lengths.
///
/// `at_eof` tells whether the stream ended right after `raw`. An unterminated
/// header is a read failure when the stream ended, and too long otherwise.
pub(super) fn parse_header(
    raw: &[u8],
    at_eof: bool,
    limits: &DecodeLimits,
) -> Result<(Encoding, u64, u64), DecodeError> {
    let header = match raw.split_last() {
        Some((&HEADER_TERMINATOR, header)) => header,
        _ if !at_eof && raw.len() >= limits.max_header_len => {
            return Err(DecodeError::HeaderTooLong {
                limit: limits.max_header_len,
            })
        }
        _ => {
            return Err(DecodeError::ReadHeader(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended before info header terminator",
            )))
        }
    };

    let fields = parse_fields(header)?;

    let version = *fields.first().ok_or(DecodeError::MissingVersion)?;
    match Encoding::from_version(version) {
        Some(Encoding::Json) => {
            let (details_len, params_len) = json_lengths(&fields, limits)?;
            Ok((Encoding::Json, details_len, params_len))
        }
        None => Err(DecodeError::UnsupportedVersion { version }),
    }
}

fn parse_fields(header: &[u8]) -> Result<Vec<i64>, DecodeError> {
    let text = String::from_utf8_lossy(header);
    text.split(HEADER_SEPARATOR)
        .map(|part| {
            part.parse::<i64>().map_err(|_| DecodeError::HeaderNotInt {
                part: part.to_string(),
            })
        })
        .collect()
}

fn json_lengths(fields: &[i64], limits: &DecodeLimits) -> Result<(u64, u64), DecodeError> {
    let malformed = || DecodeError::MalformedHeader {
        header: fields.to_vec(),
    };

    let [_, details_len, params_len] = fields else {
        return Err(malformed());
    };
    let details_len = u64::try_from(*details_len).map_err(|_| malformed())?;
    let params_len = u64::try_from(*params_len).map_err(|_| malformed())?;

    for declared in [details_len, params_len] {
        if declared > limits.max_payload_len {
            return Err(DecodeError::PayloadTooLarge {
                declared,
                limit: limits.max_payload_len,
            });
        }
    }

    Ok((details_len, params_len))
}

fn read_segment<R: Read>(reader: R, len: u64) -> io::Result<Bytes> {
    let mut buf = Vec::with_capacity(len.min(SEGMENT_PREALLOC) as usize);
    let read = reader.take(len).read_to_end(&mut buf)?;
    check_segment_len(read, len)?;
    Ok(Bytes::from(buf))
}

pub(super) fn check_segment_len(read: usize, len: u64) -> io::Result<()> {
    if (read as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, got {read}"),
        ));
    }
    Ok(())
}
