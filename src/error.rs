//! Error types shared across the hoist SDK.
//!
//! Each component owns a closed error enum. Every enum implements [`Kind`],
//! which names the error family with a stable string so it can be exported
//! on the wire as an [`ExportedError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handler::InvokeError;

/// Stable, wire-visible name for an error family.
pub trait Kind {
    /// Snake-case kind name, e.g. `"function_not_found"`.
    fn kind(&self) -> &'static str;
}

/// Structured kind/message representation of an error.
///
/// This is what callers see for framework failures (routing, decoding,
/// encoding), where only a generic shape is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedError {
    /// Kind name (see [`Kind`]).
    pub kind: String,
    /// Human readable message.
    pub message: String,
}

impl ExportedError {
    /// Export any error that carries a kind.
    pub fn of<E: Kind + fmt::Display + ?Sized>(err: &E) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Reason a candidate could not be turned into a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFunction {
    /// The candidate is not callable.
    #[error("a function was not provided")]
    NotAFunction,

    /// The candidate does not take `(context, params)`.
    #[error("function must have exactly two parameters: (context, params), got: {got}")]
    InvalidParameterCount { got: usize },

    /// The candidate does not return `(data, error)`.
    #[error("function must have exactly two return values: (data, error), got: {got}")]
    InvalidReturnCount { got: usize },

    /// The second output is not error-shaped.
    #[error("second return value must be an error")]
    MissingErrorReturn,
}

impl Kind for InvalidFunction {
    fn kind(&self) -> &'static str {
        "invalid_function"
    }
}

/// A registration that failed, tagged with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service '{service}' could not register function '{function}': {reason}")]
pub struct RegistrationError {
    /// Owning service name.
    pub service: String,
    /// Name the candidate was registered under.
    pub function: String,
    /// Why validation failed.
    #[source]
    pub reason: InvalidFunction,
}

impl Kind for RegistrationError {
    fn kind(&self) -> &'static str {
        self.reason.kind()
    }
}

/// Failure of [`Service::call`](crate::Service::call).
#[derive(Debug, Error)]
pub enum CallError {
    /// No handler is registered under the requested name.
    #[error("service '{service}' does not have function '{function}'")]
    FunctionNotFound { service: String, function: String },

    /// The handler was found and ran, but failed.
    #[error("service '{service}': error while calling function '{function}': {cause}")]
    FunctionCallFailed {
        service: String,
        function: String,
        #[source]
        cause: InvokeError,
    },
}

impl CallError {
    /// The invocation failure, if the handler was reached.
    pub fn cause(&self) -> Option<&InvokeError> {
        match self {
            CallError::FunctionNotFound { .. } => None,
            CallError::FunctionCallFailed { cause, .. } => Some(cause),
        }
    }
}

impl Kind for CallError {
    fn kind(&self) -> &'static str {
        match self {
            CallError::FunctionNotFound { .. } => "function_not_found",
            CallError::FunctionCallFailed { .. } => "function_call",
        }
    }
}
