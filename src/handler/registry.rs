//! Handler registry: type-erased handlers keyed by function name.
//!
//! Candidates are turned into handlers through [`IntoHandler`]. Typed
//! functions are checked by the compiler; dynamic values are checked when
//! they are registered. Failed registrations are collected, never raised.
//!
//! # Example
//!
//! ```
//! use hoist::handler::{HandlerError, HandlerRegistry};
//! use serde::Deserialize;
//!
//! #[derive(Default)]
//! struct Ctx;
//!
//! #[derive(Deserialize)]
//! struct Greet {
//!     name: String,
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("svc", "greet", |_: Ctx, p: Greet| -> Result<String, HandlerError> {
//!     Ok(format!("hello {}", p.name))
//! });
//!
//! let handler = registry.get("greet").unwrap();
//! assert_eq!(&handler.call(br#"{"name":"bob"}"#).unwrap()[..], br#""hello bob""#);
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::HandlerError;
use crate::codec::JsonCodec;
use crate::error::{InvalidFunction, Kind, RegistrationError};

/// Failure while invoking a handler.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The raw params are not valid JSON for the declared params type.
    /// The handler was not called.
    #[error("could not unmarshal JSON '{original_payload}'")]
    ParamsUnmarshal {
        original_payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// The handler ran and returned an error.
    #[error("{0}")]
    Handler(HandlerError),

    /// The handler's result cannot be represented as JSON.
    #[error("could not encode result")]
    ResultEncode(#[source] serde_json::Error),

    /// A dynamic function returned something other than `(data, error)`.
    #[error("second return value must be an error")]
    ReturnShape,
}

impl InvokeError {
    pub(crate) fn params_unmarshal(raw_params: &[u8], source: serde_json::Error) -> Self {
        InvokeError::ParamsUnmarshal {
            original_payload: String::from_utf8_lossy(raw_params).into_owned(),
            source,
        }
    }

    /// The handler's own error, if that is what failed.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            InvokeError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

impl Kind for InvokeError {
    fn kind(&self) -> &'static str {
        match self {
            InvokeError::ParamsUnmarshal { .. } | InvokeError::Handler(_) => "function_call",
            InvokeError::ResultEncode(_) => "json_marshalling",
            InvokeError::ReturnShape => "invalid_function",
        }
    }
}

/// Uniform invocation path for a registered function.
pub trait Handler: Send + Sync + 'static {
    /// Invoke with raw JSON params; returns the JSON encoded result.
    fn call(&self, raw_params: &[u8]) -> Result<Bytes, InvokeError>;
}

/// Handler over a typed function `Fn(C, P) -> Result<R, E>`.
///
/// `C` is materialized with `Default` on every call; `P` is deserialized from
/// the raw params.
pub struct TypedHandler<F, C, P, R, E> {
    handler: F,
    _phantom: PhantomData<fn(C, P) -> Result<R, E>>,
}

impl<F, C, P, R, E> TypedHandler<F, C, P, R, E>
where
    F: Fn(C, P) -> Result<R, E> + Send + Sync + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, C, P, R, E> Handler for TypedHandler<F, C, P, R, E>
where
    F: Fn(C, P) -> Result<R, E> + Send + Sync + 'static,
    C: Default + 'static,
    P: DeserializeOwned + 'static,
    R: Serialize + 'static,
    E: Into<HandlerError> + 'static,
{
    fn call(&self, raw_params: &[u8]) -> Result<Bytes, InvokeError> {
        let params: P = JsonCodec::decode(raw_params)
            .map_err(|e| InvokeError::params_unmarshal(raw_params, e))?;

        match (self.handler)(C::default(), params) {
            Ok(data) => JsonCodec::encode(&data)
                .map(Bytes::from)
                .map_err(InvokeError::ResultEncode),
            Err(err) => Err(InvokeError::Handler(err.into())),
        }
    }
}

/// Something that can be registered as a handler.
///
/// `M` is a marker that keeps the typed and dynamic impls apart; callers
/// never name it.
pub trait IntoHandler<M> {
    /// Validate the candidate and build its handler.
    ///
    /// # Errors
    ///
    /// Returns the first calling-convention violation found.
    fn into_handler(self) -> Result<Arc<dyn Handler>, InvalidFunction>;
}

/// Marker for typed function candidates.
pub struct Typed<C, P, R, E>(PhantomData<fn(C, P) -> Result<R, E>>);

impl<F, C, P, R, E> IntoHandler<Typed<C, P, R, E>> for F
where
    F: Fn(C, P) -> Result<R, E> + Send + Sync + 'static,
    C: Default + 'static,
    P: DeserializeOwned + 'static,
    R: Serialize + 'static,
    E: Into<HandlerError> + 'static,
{
    fn into_handler(self) -> Result<Arc<dyn Handler>, InvalidFunction> {
        Ok(Arc::new(TypedHandler::new(self)))
    }
}

/// Registry mapping function names to handlers.
///
/// Holds every successfully built handler plus, in registration order, every
/// registration that failed. Not synchronized; [`Service`](crate::Service)
/// wraps it in a lock.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Handlers by function name.
    functions: HashMap<String, Arc<dyn Handler>>,
    /// Failed registrations, oldest first.
    errors: Vec<RegistrationError>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate under `name`.
    ///
    /// On failure nothing is installed and the error is recorded, tagged with
    /// `service` and `name`.
    pub fn register<M, H: IntoHandler<M>>(&mut self, service: &str, name: &str, candidate: H) {
        match candidate.into_handler() {
            Ok(handler) => self.insert(name, handler),
            Err(reason) => self.record_failure(service, name, reason),
        }
    }

    /// Install an already built handler, replacing any previous one.
    pub fn insert(&mut self, name: &str, handler: Arc<dyn Handler>) {
        self.functions.insert(name.to_string(), handler);
    }

    /// Record a failed registration.
    pub fn record_failure(&mut self, service: &str, name: &str, reason: InvalidFunction) {
        self.errors.push(RegistrationError {
            service: service.to_string(),
            function: name.to_string(),
            reason,
        });
    }

    /// Get a handler by function name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.functions.get(name).cloned()
    }

    /// Names of all registered functions, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Failed registrations, oldest first.
    pub fn errors(&self) -> &[RegistrationError] {
        &self.errors
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no function is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Ctx;

    #[derive(Deserialize)]
    struct Params {
        abc: String,
    }

    #[derive(Serialize)]
    struct Data {
        my_val: String,
    }

    #[derive(Serialize)]
    struct Unordered {
        zeta: u8,
        alpha: u8,
    }

    #[test]
    fn test_register_and_call_typed() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "svc",
            "myFunc",
            |_: Ctx, p: Params| -> Result<Data, HandlerError> {
                Ok(Data {
                    my_val: p.abc + "!",
                })
            },
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.errors().is_empty());

        let handler = registry.get("myFunc").unwrap();
        let result = handler.call(br#"{"abc":"hi"}"#).unwrap();
        assert_eq!(&result[..], br#"{"my_val":"hi!"}"#);
    }

    #[test]
    fn test_params_unmarshal_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut registry = HandlerRegistry::new();
        registry.register("svc", "count", move |_: Ctx, _: Params| -> Result<(), HandlerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = registry.get("count").unwrap().call(br#"{"abc": 1}"#).unwrap_err();
        match &err {
            InvokeError::ParamsUnmarshal {
                original_payload, ..
            } => assert_eq!(original_payload, r#"{"abc": 1}"#),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), "function_call");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_error_is_preserved() {
        #[derive(Debug, thiserror::Error)]
        #[error("it's an error")]
        struct MyErr;

        let mut registry = HandlerRegistry::new();
        registry.register("svc", "fails", |_: Ctx, _: Params| -> Result<Data, MyErr> {
            Err(MyErr)
        });

        let err = registry.get("fails").unwrap().call(br#"{"abc":"x"}"#).unwrap_err();
        let handler_err = err.handler_error().unwrap();
        assert!(handler_err.is::<MyErr>());
        assert_eq!(err.to_string(), "it's an error");
    }

    #[test]
    fn test_result_encode_failure() {
        let mut registry = HandlerRegistry::new();
        registry.register("svc", "bad", |_: Ctx, _: ()| {
            Ok::<_, HandlerError>(HashMap::from([((1u8, 1u8), 1u8)]))
        });

        let err = registry.get("bad").unwrap().call(b"null").unwrap_err();
        assert!(matches!(err, InvokeError::ResultEncode(_)));
        assert_eq!(err.to_string(), "could not encode result");
        assert_eq!(err.kind(), "json_marshalling");
    }

    #[test]
    fn test_result_keeps_field_order() {
        let mut registry = HandlerRegistry::new();
        registry.register("svc", "unordered", |_: Ctx, _: ()| -> Result<Unordered, HandlerError> {
            Ok(Unordered { zeta: 1, alpha: 2 })
        });

        let result = registry.get("unordered").unwrap().call(b"null").unwrap();
        assert_eq!(&result[..], br#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_result_beyond_u64() {
        let big = u128::from(u64::MAX) + 1;

        let mut registry = HandlerRegistry::new();
        registry.register("svc", "big", move |_: Ctx, _: ()| -> Result<u128, HandlerError> {
            Ok(big)
        });

        let result = registry.get("big").unwrap().call(b"null").unwrap();
        assert_eq!(&result[..], b"18446744073709551616");
    }

    #[test]
    fn test_context_is_fresh_default() {
        #[derive(Default)]
        struct Counting {
            seen: u32,
        }

        let mut registry = HandlerRegistry::new();
        registry.register("svc", "ctx", |ctx: Counting, _: ()| -> Result<u32, HandlerError> {
            Ok(ctx.seen + 1)
        });

        let handler = registry.get("ctx").unwrap();
        assert_eq!(&handler.call(b"null").unwrap()[..], b"1");
        assert_eq!(&handler.call(b"null").unwrap()[..], b"1");
    }

    #[test]
    fn test_record_failure_keeps_order() {
        let mut registry = HandlerRegistry::new();
        registry.record_failure("svc", "a", InvalidFunction::NotAFunction);
        registry.record_failure("svc", "b", InvalidFunction::MissingErrorReturn);

        let errors = registry.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].function, "a");
        assert_eq!(errors[1].reason, InvalidFunction::MissingErrorReturn);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_name() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names().count(), 0);
    }
}
