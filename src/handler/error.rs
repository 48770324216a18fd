//! Errors returned by handler functions.
//!
//! A handler error comes in one of two shapes:
//!
//! - **plain**: any [`std::error::Error`]; the caller sees its description.
//! - **exportable**: an error implementing [`ExportError`]; the caller sees
//!   the value returned by [`ExportError::export`].
//!
//! # Example
//!
//! ```
//! use hoist::handler::{ExportError, HandlerError};
//! use serde::Serialize;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("insufficient funds")]
//! struct InsufficientFunds {
//!     missing: u64,
//! }
//!
//! #[derive(Serialize)]
//! struct Public {
//!     code: &'static str,
//!     missing: u64,
//! }
//!
//! impl ExportError for InsufficientFunds {
//!     type Export = Public;
//!
//!     fn export(&self) -> Public {
//!         Public { code: "insufficient_funds", missing: self.missing }
//!     }
//! }
//!
//! let err = HandlerError::exportable(InsufficientFunds { missing: 5 });
//! assert!(err.is::<InsufficientFunds>());
//! assert_eq!(
//!     err.export().unwrap().unwrap(),
//!     serde_json::json!({"code": "insufficient_funds", "missing": 5}),
//! );
//! ```

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::codec::JsonCodec;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error that chooses what callers get to see.
pub trait ExportError: StdError + Send + Sync + 'static {
    /// Caller-visible payload.
    type Export: Serialize;

    /// Build the caller-visible payload.
    fn export(&self) -> Self::Export;
}

/// Object-safe view of an [`ExportError`].
trait ErasedExport: Send + Sync {
    fn export_value(&self) -> serde_json::Result<Value>;
    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static);
}

impl<E: ExportError> ErasedExport for E {
    fn export_value(&self) -> serde_json::Result<Value> {
        JsonCodec::to_value(&self.export())
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }
}

enum Repr {
    Plain(BoxError),
    Exportable(Box<dyn ErasedExport>),
}

/// Error produced by a handler's own logic.
///
/// Any `std::error::Error` converts into it with `?`. The original error is
/// kept, so callers can inspect it with [`HandlerError::downcast_ref`].
pub struct HandlerError {
    repr: Repr,
}

impl HandlerError {
    /// Wrap an error that decides its own caller-visible payload.
    pub fn exportable<E: ExportError>(err: E) -> Self {
        Self {
            repr: Repr::Exportable(Box::new(err)),
        }
    }

    /// Wrap an already boxed error.
    pub fn from_boxed(err: BoxError) -> Self {
        Self {
            repr: Repr::Plain(err),
        }
    }

    /// A plain error with only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::from_boxed(Box::new(Message(message.into())))
    }

    /// The exported payload, or `None` for plain errors.
    ///
    /// The inner `Err` means the payload could not be represented as JSON.
    pub fn export(&self) -> Option<serde_json::Result<Value>> {
        match &self.repr {
            Repr::Plain(_) => None,
            Repr::Exportable(err) => Some(err.export_value()),
        }
    }

    /// Whether the error exposes an export payload.
    pub fn is_exportable(&self) -> bool {
        matches!(self.repr, Repr::Exportable(_))
    }

    /// The wrapped error.
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match &self.repr {
            Repr::Plain(err) => err.as_ref(),
            Repr::Exportable(err) => err.as_error(),
        }
    }

    /// Whether the wrapped error is an `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Borrow the wrapped error as an `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.as_error().downcast_ref::<E>()
    }
}

impl<E: StdError + Send + Sync + 'static> From<E> for HandlerError {
    fn from(err: E) -> Self {
        Self::from_boxed(Box::new(err))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_error(), f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = if self.is_exportable() { "exportable" } else { "plain" };
        f.debug_struct("HandlerError")
            .field("shape", &shape)
            .field("error", &self.as_error())
            .finish()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
