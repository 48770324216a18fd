//! Per-message request handling: decoded request in, encoded response out.
//!
//! [`respond`] is transport independent; the server feeds it whatever its
//! decoder produced and writes back the bytes it returns. It always returns
//! a response, falling back to [`FALLBACK_RESPONSE`] when not even the error
//! report can be encoded.

use bytes::Bytes;

use crate::codec::JsonCodec;
use crate::details::{RequestDetails, ResponseDetails};
use crate::policy::{export_error, RequestError};
use crate::service::Service;
use crate::wire::{self, DecodeError, DecodeResult};

/// Response sent when an error report itself cannot be encoded.
pub const FALLBACK_RESPONSE: &[u8] = concat!(
    r#"1,24,80:{"err":true,"ierr":true}"#,
    r#"{"kind":"wire_encoding_error","message":"unable to encode error to wire format"}"#,
)
.as_bytes();

/// Answer one decoded (or undecodable) message.
///
/// The response echoes the request id whenever the details could be read.
pub fn respond(service: &Service, decoded: Result<DecodeResult, DecodeError>) -> Bytes {
    let mut request_id = String::new();

    match handle(service, decoded, &mut request_id) {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!("Request '{}' failed: {}", request_id, err);
            encode_error(&request_id, &err)
        }
    }
}

fn handle(
    service: &Service,
    decoded: Result<DecodeResult, DecodeError>,
    request_id: &mut String,
) -> Result<Bytes, RequestError> {
    let decoded = decoded?;

    let details: RequestDetails =
        JsonCodec::decode(&decoded.raw_details).map_err(RequestError::InvalidDetails)?;
    request_id.clone_from(&details.request_id);

    if !details.service_name.is_empty() && details.service_name != service.name() {
        tracing::debug!(
            "Request '{}' addressed to service '{}', served by '{}'",
            details.request_id,
            details.service_name,
            service.name()
        );
    }

    let result = service.call(&details.function_name, &decoded.raw_params)?;

    let response = ResponseDetails::success(details.request_id);
    Ok(wire::encode_with_json_params(Some(&response), &result)?)
}

fn encode_error(request_id: &str, err: &RequestError) -> Bytes {
    let report = match export_error(err) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Unable to export error for request '{}': {}", request_id, e);
            return Bytes::from_static(FALLBACK_RESPONSE);
        }
    };

    let details = ResponseDetails::failure(request_id, report.is_internal);
    match wire::encode(Some(&details), &report.payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Unable to encode error for request '{}': {}", request_id, e);
            Bytes::from_static(FALLBACK_RESPONSE)
        }
    }
}
