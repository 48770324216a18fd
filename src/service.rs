//! Services: a named set of functions callable over the wire.
//!
//! A [`Service`] is built once at startup, filled with
//! [`register_as`](Service::register_as), and then shared read-mostly by the
//! serving loop. The registry sits behind one reader/writer lock; handlers are
//! invoked after the lock has been released.
//!
//! # Example
//!
//! ```
//! use hoist::handler::HandlerError;
//! use hoist::{CallError, Service};
//!
//! #[derive(Default)]
//! struct Ctx;
//!
//! let service = Service::new("math");
//! service.register_as("add", |_: Ctx, (a, b): (i64, i64)| -> Result<i64, HandlerError> {
//!     Ok(a + b)
//! });
//!
//! assert_eq!(&service.call("add", b"[2,3]").unwrap()[..], b"5");
//! assert!(matches!(
//!     service.call("sub", b"[2,3]"),
//!     Err(CallError::FunctionNotFound { .. })
//! ));
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{CallError, RegistrationError};
use crate::handler::{HandlerRegistry, IntoHandler};

/// A named collection of functions.
pub struct Service {
    name: String,
    registry: RwLock<HandlerRegistry>,
}

impl Service {
    /// Create an empty service.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: RwLock::new(HandlerRegistry::new()),
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `candidate` under `name`.
    ///
    /// Never fails. An invalid candidate is recorded in [`errors`](Self::errors)
    /// and nothing is installed; other registrations are unaffected. A valid
    /// candidate replaces any function already registered under `name`.
    pub fn register_as<M, H: IntoHandler<M>>(&self, name: &str, candidate: H) {
        // Validation needs no lock
        let built = candidate.into_handler();

        let mut registry = self.registry.write();
        match built {
            Ok(handler) => {
                registry.insert(name, handler);
                tracing::debug!("Service '{}' registered function '{}'", self.name, name);
            }
            Err(reason) => {
                tracing::warn!(
                    "Service '{}' could not register function '{}': {}",
                    self.name,
                    name,
                    reason
                );
                registry.record_failure(&self.name, name, reason);
            }
        }
    }

    /// Call the function registered under `name` with raw JSON params and
    /// return its JSON encoded result.
    ///
    /// # Errors
    ///
    /// [`CallError::FunctionNotFound`] if nothing is registered under `name`,
    /// [`CallError::FunctionCallFailed`] wrapping whatever the invocation
    /// failed with.
    pub fn call(&self, name: &str, raw_params: &[u8]) -> Result<Bytes, CallError> {
        let handler = self.registry.read().get(name);

        let Some(handler) = handler else {
            return Err(CallError::FunctionNotFound {
                service: self.name.clone(),
                function: name.to_string(),
            });
        };

        handler
            .call(raw_params)
            .map_err(|cause| CallError::FunctionCallFailed {
                service: self.name.clone(),
                function: name.to_string(),
                cause,
            })
    }

    /// Snapshot of the currently registered functions.
    pub fn export(&self) -> ExportedService {
        let registry = self.registry.read();
        let functions = registry
            .names()
            .map(|name| {
                (
                    name.to_string(),
                    ExportedFunction {
                        name: name.to_string(),
                    },
                )
            })
            .collect();

        ExportedService {
            name: self.name.clone(),
            functions,
        }
    }

    /// Failed registrations, oldest first.
    ///
    /// Returns a copy; mutating it does not affect the service.
    pub fn errors(&self) -> Vec<RegistrationError> {
        self.registry.read().errors().to_vec()
    }

    /// Whether every registration so far succeeded.
    pub fn is_valid(&self) -> bool {
        self.registry.read().errors().is_empty()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("functions", &registry.len())
            .field("errors", &registry.errors().len())
            .finish()
    }
}

/// Read-only snapshot of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedService {
    /// Service name.
    pub name: String,
    /// Registered functions by name.
    pub functions: HashMap<String, ExportedFunction>,
}

/// A function in an [`ExportedService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFunction {
    /// Function name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidFunction;
    use crate::handler::{DynamicFunction, DynamicValue, HandlerError, InvokeError, Output, Slot};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

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

    fn my_func(_: Ctx, p: Params) -> Result<Data, HandlerError> {
        Ok(Data { my_val: p.abc })
    }

    fn dynamic(inputs: usize, outputs: Vec<Slot>) -> DynamicValue {
        DynamicFunction::new(inputs, outputs, |_| {
            vec![Output::Value(Value::Null), Output::Error(None)]
        })
        .into()
    }

    #[test]
    fn test_call() {
        let service = Service::new("abc");
        service.register_as("myFunc", my_func);

        let result = service.call("myFunc", br#"{"abc":"hello"}"#).unwrap();
        assert_eq!(&result[..], br#"{"my_val":"hello"}"#);
    }

    #[test]
    fn test_call_result_is_encoded_as_declared() {
        #[derive(Serialize)]
        struct Out {
            zeta: u8,
            alpha: u8,
        }

        let service = Service::new("abc");
        service.register_as("out", |_: Ctx, _: ()| -> Result<Out, HandlerError> {
            Ok(Out { zeta: 1, alpha: 2 })
        });
        service.register_as("big", |_: Ctx, _: ()| -> Result<u128, HandlerError> {
            Ok(u128::from(u64::MAX) + 1)
        });

        let out = service.call("out", b"null").unwrap();
        assert_eq!(&out[..], br#"{"zeta":1,"alpha":2}"#);

        let big = service.call("big", b"null").unwrap();
        assert_eq!(&big[..], b"18446744073709551616");
    }

    #[test]
    fn test_call_not_found() {
        let service = Service::new("abc");

        let err = service.call("dne", b"{}").unwrap_err();
        assert_eq!(err.to_string(), "service 'abc' does not have function 'dne'");
        match err {
            CallError::FunctionNotFound { service, function } => {
                assert_eq!(service, "abc");
                assert_eq!(function, "dne");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_call_params_unmarshal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let service = Service::new("abc");
        service.register_as("myFunc", move |_: Ctx, p: Params| -> Result<Data, HandlerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Data { my_val: p.abc })
        });

        let err = service.call("myFunc", br#"{"abc":5}"#).unwrap_err();
        assert!(matches!(
            err.cause(),
            Some(InvokeError::ParamsUnmarshal { .. })
        ));
        assert!(err.to_string().starts_with(
            "service 'abc': error while calling function 'myFunc': could not unmarshal JSON"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_call_keeps_handler_error_identity() {
        #[derive(Debug, thiserror::Error)]
        #[error("it's an error")]
        struct MyErr;

        let service = Service::new("abc");
        service.register_as("fails", |_: Ctx, _: ()| -> Result<(), MyErr> { Err(MyErr) });

        let err = service.call("fails", b"null").unwrap_err();
        let cause = err.cause().and_then(InvokeError::handler_error).unwrap();
        assert!(cause.is::<MyErr>());
    }

    #[test]
    fn test_invalid_registrations_accumulate() {
        let service = Service::new("abc");

        service.register_as("one", dynamic(1, vec![Slot::Value, Slot::Error]));
        service.register_as("valid", my_func);
        service.register_as("three", dynamic(3, vec![Slot::Value, Slot::Error]));
        service.register_as("single", dynamic(2, vec![Slot::Error]));
        service.register_as("noerr", dynamic(2, vec![Slot::Value, Slot::Value]));
        service.register_as("nil", DynamicValue::Nil);

        let reasons: Vec<_> = service
            .errors()
            .into_iter()
            .map(|e| (e.function, e.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("one".to_string(), InvalidFunction::InvalidParameterCount { got: 1 }),
                ("three".to_string(), InvalidFunction::InvalidParameterCount { got: 3 }),
                ("single".to_string(), InvalidFunction::InvalidReturnCount { got: 1 }),
                ("noerr".to_string(), InvalidFunction::MissingErrorReturn),
                ("nil".to_string(), InvalidFunction::NotAFunction),
            ]
        );
        assert!(!service.is_valid());

        // Failed names stay unregistered, valid ones keep working
        assert!(matches!(
            service.call("one", b"null"),
            Err(CallError::FunctionNotFound { .. })
        ));
        assert!(service.call("valid", br#"{"abc":"x"}"#).is_ok());
    }

    #[test]
    fn test_valid_registration_after_failure() {
        let service = Service::new("abc");
        service.register_as("myFunc", DynamicValue::Nil);
        service.register_as("myFunc", my_func);

        assert!(service.call("myFunc", br#"{"abc":"x"}"#).is_ok());
        assert_eq!(service.errors().len(), 1);
    }

    #[test]
    fn test_errors_returns_copy() {
        let service = Service::new("abc");
        service.register_as("nil", DynamicValue::Nil);

        let mut errors = service.errors();
        errors.clear();
        assert_eq!(service.errors().len(), 1);
    }

    #[test]
    fn test_export() {
        let service = Service::new("abc");
        service.register_as("myFunc", my_func);
        service.register_as("other", my_func);
        service.register_as("broken", DynamicValue::Nil);

        let exported = service.export();
        assert_eq!(exported.name, "abc");
        assert_eq!(exported.functions.len(), 2);
        assert_eq!(exported.functions["myFunc"].name, "myFunc");
        assert!(!exported.functions.contains_key("broken"));

        // Snapshot does not follow later registrations
        service.register_as("late", my_func);
        assert_eq!(exported.functions.len(), 2);
        assert_eq!(service.export().functions.len(), 3);
    }

    #[test]
    fn test_slow_handler_does_not_hold_lock() {
        let barrier = Arc::new(Barrier::new(2));
        let inside = barrier.clone();

        let service = Arc::new(Service::new("abc"));
        service.register_as("wait", move |_: Ctx, _: ()| -> Result<(), HandlerError> {
            inside.wait();
            inside.wait();
            Ok(())
        });

        let caller = {
            let service = service.clone();
            std::thread::spawn(move || service.call("wait", b"null").is_ok())
        };

        // Handler is running; registry stays usable
        barrier.wait();
        service.register_as("myFunc", my_func);
        assert_eq!(service.export().functions.len(), 2);
        barrier.wait();

        assert!(caller.join().unwrap());
    }
}
