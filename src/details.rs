//! Details segment of request and response messages.
//!
//! The details segment carries routing and status information; the params
//! segment carries the payload.
//!
//! # Example
//!
//! ```
//! use hoist::details::{RequestDetails, ResponseDetails};
//!
//! let request: RequestDetails =
//!     serde_json::from_str(r#"{"id":"42","svc":"math","fn":"add"}"#).unwrap();
//! assert_eq!(request.function_name, "add");
//!
//! let response = ResponseDetails::success(&request.request_id);
//! assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"id":"42"}"#);
//! ```

use serde::{Deserialize, Serialize};

/// Details of an inbound request.
///
/// Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDetails {
    /// Correlation id, echoed in the response.
    #[serde(rename = "id")]
    pub request_id: String,
    /// Target service.
    #[serde(rename = "svc")]
    pub service_name: String,
    /// Target function.
    #[serde(rename = "fn")]
    pub function_name: String,
}

impl RequestDetails {
    /// Create request details.
    pub fn new(
        request_id: impl Into<String>,
        service_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            service_name: service_name.into(),
            function_name: function_name.into(),
        }
    }
}

/// Details of an outbound response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseDetails {
    /// Correlation id of the request this answers.
    #[serde(rename = "id")]
    pub request_id: String,
    /// The params segment is an error payload.
    #[serde(rename = "err", skip_serializing_if = "is_false")]
    pub is_error: bool,
    /// The error came from the framework, not from handler logic.
    #[serde(rename = "ierr", skip_serializing_if = "is_false")]
    pub is_internal_error: bool,
}

impl ResponseDetails {
    /// Details for a successful call.
    pub fn success(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Details for a failed call.
    pub fn failure(request_id: impl Into<String>, is_internal_error: bool) -> Self {
        Self {
            request_id: request_id.into(),
            is_error: true,
            is_internal_error,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_details_field_names() {
        let details = RequestDetails::new("1", "abc", "myFn");
        let json = serde_json::to_string(&details).unwrap();
        assert_eq!(json, r#"{"id":"1","svc":"abc","fn":"myFn"}"#);
    }

    #[test]
    fn test_request_details_missing_fields() {
        let details: RequestDetails = serde_json::from_str(r#"{"fn":"myFn"}"#).unwrap();
        assert_eq!(details.request_id, "");
        assert_eq!(details.service_name, "");
        assert_eq!(details.function_name, "myFn");
    }

    #[test]
    fn test_request_details_wrong_type() {
        assert!(serde_json::from_str::<RequestDetails>(r#"{"id":7}"#).is_err());
        assert!(serde_json::from_str::<RequestDetails>("\"abc\"").is_err());
    }

    #[test]
    fn test_response_details_flags() {
        let ok = serde_json::to_string(&ResponseDetails::success("9")).unwrap();
        assert_eq!(ok, r#"{"id":"9"}"#);

        let user = serde_json::to_string(&ResponseDetails::failure("9", false)).unwrap();
        assert_eq!(user, r#"{"id":"9","err":true}"#);

        let internal = serde_json::to_string(&ResponseDetails::failure("", true)).unwrap();
        assert_eq!(internal, r#"{"id":"","err":true,"ierr":true}"#);
    }

    #[test]
    fn test_response_details_decode_defaults() {
        let details: ResponseDetails = serde_json::from_str(r#"{"id":"3","err":true}"#).unwrap();
        assert_eq!(details, ResponseDetails::failure("3", false));
    }
}
