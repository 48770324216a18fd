//! # hoist
//!
//! SDK core for exposing named functions over a small length-prefixed RPC
//! wire protocol.
//!
//! ## Architecture
//!
//! - **Wire** ([`wire`]): frames a details/params pair as
//!   `<version>,<detailsLen>,<paramsLen>:<details><params>` and decodes it back
//! - **Handlers** ([`handler`]): turns typed closures, or runtime-shaped
//!   [`DynamicValue`](handler::DynamicValue)s, into uniformly callable handlers
//! - **Service** ([`Service`]): named registry and dispatcher; failed
//!   registrations are collected, not raised
//! - **Policy** ([`policy`]): decides what a caller sees when a request fails
//! - **Server** ([`Server`]): TCP transport, refuses to start while any
//!   registration has failed
//!
//! ## Example
//!
//! ```no_run
//! use hoist::handler::HandlerError;
//! use hoist::{ServeConfig, Service};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default)]
//! struct Ctx;
//!
//! #[derive(Deserialize)]
//! struct Add {
//!     a: i64,
//!     b: i64,
//! }
//!
//! #[derive(Serialize)]
//! struct Sum {
//!     sum: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Service::new("math");
//!     service.register_as("add", |_: Ctx, p: Add| -> Result<Sum, HandlerError> {
//!         Ok(Sum { sum: p.a + p.b })
//!     });
//!
//!     service.serve(ServeConfig::from_env()?).await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod details;
pub mod error;
pub mod handler;
pub mod policy;
pub mod transport;
pub mod wire;

mod responder;
mod server;
mod service;

pub use config::{ConfigError, ServeConfig};
pub use error::{CallError, ExportedError, InvalidFunction, Kind, RegistrationError};
pub use responder::{respond, FALLBACK_RESPONSE};
pub use server::{ServeError, Server};
pub use service::{ExportedFunction, ExportedService, Service};
