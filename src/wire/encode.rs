//! Message encoding.
//!
//! # Example
//!
//! ```
//! use hoist::wire;
//! use serde_json::json;
//!
//! let bytes = wire::encode(Some(&json!({"svc": "abc"})), &json!({"m": 1})).unwrap();
//! assert_eq!(&bytes[..], br#"1,13,7:{"svc":"abc"}{"m":1}"#);
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;

use super::{DEFAULT_ENCODING, HEADER_SEPARATOR, HEADER_TERMINATOR};
use crate::codec::JsonCodec;
use crate::error::Kind;

/// Failure to encode a message.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Details were absent. Always a programming error.
    #[error("details cannot be nil")]
    NilDetails,

    /// The details segment could not be serialized.
    #[error("could not encode details")]
    Details(#[source] serde_json::Error),

    /// The params segment could not be serialized.
    #[error("could not encode params")]
    Params(#[source] serde_json::Error),
}

impl Kind for EncodeError {
    fn kind(&self) -> &'static str {
        match self {
            EncodeError::NilDetails => "nil_details",
            EncodeError::Details(_) | EncodeError::Params(_) => "json_marshalling",
        }
    }
}

/// Encode details and params into one wire message.
///
/// Both segments are serialized; if either fails the whole encode fails,
/// and a params failure is reported ahead of a details failure.
/// If the params are already JSON encoded, use [`encode_with_json_params`].
///
/// # Errors
///
/// [`EncodeError::NilDetails`] when `details` is `None` (whatever `params`
/// is), otherwise [`EncodeError::Params`] / [`EncodeError::Details`].
pub fn encode<D, P>(details: Option<&D>, params: &P) -> Result<Bytes, EncodeError>
where
    D: Serialize + ?Sized,
    P: Serialize + ?Sized,
{
    let details = details.ok_or(EncodeError::NilDetails)?;

    let details_json = JsonCodec::encode(details);
    let params_json = JsonCodec::encode(params).map_err(EncodeError::Params)?;
    let details_json = details_json.map_err(EncodeError::Details)?;

    Ok(frame(&details_json, &params_json))
}

/// Encode details with params that are already JSON encoded.
///
/// The params bytes are forwarded as-is without being parsed.
///
/// # Errors
///
/// [`EncodeError::NilDetails`] or [`EncodeError::Details`].
pub fn encode_with_json_params<D>(
    details: Option<&D>,
    params_json: &[u8],
) -> Result<Bytes, EncodeError>
where
    D: Serialize + ?Sized,
{
    let details = details.ok_or(EncodeError::NilDetails)?;
    let details_json = JsonCodec::encode(details).map_err(EncodeError::Details)?;

    Ok(frame(&details_json, params_json))
}

/// Lay out `<version>,<len>,<len>:<details><params>`.
fn frame(details: &[u8], params: &[u8]) -> Bytes {
    let header = format!(
        "{}{sep}{}{sep}{}",
        DEFAULT_ENCODING,
        details.len(),
        params.len(),
        sep = HEADER_SEPARATOR,
    );

    let mut buf = BytesMut::with_capacity(header.len() + 1 + details.len() + params.len());
    buf.put_slice(header.as_bytes());
    buf.put_u8(HEADER_TERMINATOR);
    buf.put_slice(details);
    buf.put_slice(params);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Details {
        service: String,
    }

    #[derive(Serialize)]
    struct Params {
        message: String,
    }

    fn unencodable() -> HashMap<(u8, u8), u8> {
        let mut map = HashMap::new();
        map.insert((1, 1), 1);
        map
    }

    #[test]
    fn test_encode_layout() {
        let details = Details {
            service: "abc".to_string(),
        };
        let params = Params {
            message: "hello".to_string(),
        };

        let bytes = encode(Some(&details), &params).unwrap();
        assert_eq!(
            &bytes[..],
            br#"1,17,19:{"service":"abc"}{"message":"hello"}"#
        );
    }

    #[test]
    fn test_encode_lengths_are_bytes() {
        let bytes = encode(Some("é"), "ü").unwrap();
        assert_eq!(&bytes[..], "1,4,4:\"é\"\"ü\"".as_bytes());
    }

    #[test]
    fn test_encode_nil_details() {
        let none: Option<&Details> = None;

        let err = encode(none, &Params { message: "x".into() }).unwrap_err();
        assert!(matches!(err, EncodeError::NilDetails));

        // Unencodable params do not take precedence over nil details
        let err = encode(none, &unencodable()).unwrap_err();
        assert!(matches!(err, EncodeError::NilDetails));
        assert_eq!(err.kind(), "nil_details");
    }

    #[test]
    fn test_encode_params_failure() {
        let details = Details {
            service: "abc".to_string(),
        };

        let err = encode(Some(&details), &unencodable()).unwrap_err();
        assert!(matches!(err, EncodeError::Params(_)));
        assert_eq!(err.to_string(), "could not encode params");
        assert_eq!(err.kind(), "json_marshalling");
    }

    #[test]
    fn test_encode_details_failure() {
        let err = encode(Some(&unencodable()), &()).unwrap_err();
        assert!(matches!(err, EncodeError::Details(_)));
        assert_eq!(err.to_string(), "could not encode details");
    }

    #[test]
    fn test_encode_both_fail_reports_params() {
        let err = encode(Some(&unencodable()), &unencodable()).unwrap_err();
        assert!(matches!(err, EncodeError::Params(_)));
    }

    #[test]
    fn test_encode_with_json_params_forwards_bytes() {
        let details = Details {
            service: "abc".to_string(),
        };

        // Not re-parsed, so even non-JSON passes through untouched
        let bytes = encode_with_json_params(Some(&details), b"raw!").unwrap();
        assert_eq!(&bytes[..], br#"1,17,4:{"service":"abc"}raw!"#);
    }

    #[test]
    fn test_encode_with_json_params_empty() {
        let bytes = encode_with_json_params(Some(&()), b"").unwrap();
        assert_eq!(&bytes[..], b"1,4,0:null");
    }

    #[test]
    fn test_encode_with_json_params_nil_details() {
        let none: Option<&Details> = None;
        let err = encode_with_json_params(none, b"{}").unwrap_err();
        assert!(matches!(err, EncodeError::NilDetails));
    }
}
