//! Error export policy: what a caller gets to see when a request fails.
//!
//! Errors produced by handler logic are domain errors and are shown with the
//! most specific representation their author supplied:
//!
//! - an exportable error ([`ExportError`](crate::handler::ExportError)) shows
//!   its exported value;
//! - any other handler error shows its description string.
//!
//! Every other failure (unknown function, bad framing, bad details, params
//! that do not fit, unencodable results) is a framework error. It is flattened
//! to an [`ExportedError`] and flagged internal.

use serde_json::Value;
use thiserror::Error;

use crate::codec::JsonCodec;
use crate::error::{CallError, ExportedError, Kind};
use crate::handler::InvokeError;
use crate::wire::{DecodeError, EncodeError};

/// Anything that can go wrong while answering one request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The details segment is not valid request details.
    #[error("could not unmarshal request details")]
    InvalidDetails(#[source] serde_json::Error),

    /// Dispatch failed.
    #[error(transparent)]
    Call(#[from] CallError),

    /// The response could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl Kind for RequestError {
    fn kind(&self) -> &'static str {
        match self {
            RequestError::Decode(err) => err.kind(),
            RequestError::InvalidDetails(_) => "bad_request",
            RequestError::Call(err) => err.kind(),
            RequestError::Encode(err) => err.kind(),
        }
    }
}

/// Caller-visible form of a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    /// Params segment of the error response.
    pub payload: Value,
    /// The failure came from the framework rather than handler logic.
    pub is_internal: bool,
}

/// Decide how `err` is shown to the caller.
///
/// # Errors
///
/// Fails only when an exportable handler error exports a value that cannot
/// be represented as JSON; the caller must then answer with a fixed fallback.
pub fn export_error(err: &RequestError) -> serde_json::Result<ErrorReport> {
    let handler_err = match err {
        RequestError::Call(call) => call.cause().and_then(InvokeError::handler_error),
        _ => None,
    };

    let Some(handler_err) = handler_err else {
        return Ok(ErrorReport {
            payload: JsonCodec::to_value(&internal_error(err))?,
            is_internal: true,
        });
    };

    let payload = match handler_err.export() {
        Some(exported) => exported?,
        None => Value::String(handler_err.to_string()),
    };

    Ok(ErrorReport {
        payload,
        is_internal: false,
    })
}

/// A result that could not be encoded is reported as a marshalling failure,
/// not as a failed call.
fn internal_error(err: &RequestError) -> ExportedError {
    let cause = match err {
        RequestError::Call(call) => call.cause(),
        _ => None,
    };

    match cause {
        Some(cause @ InvokeError::ResultEncode(_)) => ExportedError::of(cause),
        _ => ExportedError::of(err),
    }
}
