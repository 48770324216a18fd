//! Handler module - turning functions into uniformly callable handlers.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps function names to handlers and collects
//!   failed registrations
//! - [`IntoHandler`] - typed closures and [`DynamicValue`]s become handlers
//! - [`HandlerError`] / [`ExportError`] - what a handler may fail with
//!
//! # Example
//!
//! ```
//! use hoist::handler::{HandlerError, HandlerRegistry};
//!
//! #[derive(Default)]
//! struct Ctx;
//!
//! let mut registry = HandlerRegistry::new();
//!
//! registry.register("math", "double", |_: Ctx, n: i64| -> Result<i64, HandlerError> {
//!     Ok(n * 2)
//! });
//!
//! registry.register("math", "fail", |_: Ctx, _: ()| -> Result<(), HandlerError> {
//!     Err(HandlerError::msg("nope"))
//! });
//!
//! let doubled = registry.get("double").unwrap().call(b"21").unwrap();
//! assert_eq!(&doubled[..], b"42");
//! ```

mod dynamic;
mod error;
mod registry;

pub use dynamic::{Dynamic, DynamicFunction, DynamicValue, Output, Slot};
pub use error::{ExportError, HandlerError};
pub use registry::{Handler, HandlerRegistry, IntoHandler, InvokeError, Typed, TypedHandler};
