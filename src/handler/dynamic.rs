//! Runtime-shaped handlers.
//!
//! A [`DynamicValue`] is a candidate whose shape is only known at run time,
//! e.g. a function loaded from a plugin. It declares how many inputs it
//! takes and what its output slots are; registration checks that
//! declaration against the `(context, params) -> (data, error)` convention.
//!
//! # Example
//!
//! ```
//! use hoist::handler::{DynamicFunction, DynamicValue, Output, Slot};
//! use hoist::Service;
//! use serde_json::Value;
//!
//! let service = Service::new("plugins");
//!
//! let echo = DynamicFunction::new(2, vec![Slot::Value, Slot::Error], |mut args: Vec<Value>| {
//!     vec![Output::Value(args.pop().unwrap_or(Value::Null)), Output::Error(None)]
//! });
//! service.register_as("echo", DynamicValue::Function(echo));
//!
//! // Not a function at all
//! service.register_as("broken", DynamicValue::Nil);
//!
//! assert_eq!(&service.call("echo", b"[1,2]").unwrap()[..], b"[1,2]");
//! assert_eq!(service.errors().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use super::registry::{Handler, IntoHandler, InvokeError};
use super::HandlerError;
use crate::codec::JsonCodec;
use crate::error::InvalidFunction;

/// Declared kind of one output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Any JSON value.
    Value,
    /// An error, or nothing.
    Error,
}

/// One value produced by a dynamic function.
#[derive(Debug)]
pub enum Output {
    Value(Value),
    Error(Option<HandlerError>),
}

type Body = Arc<dyn Fn(Vec<Value>) -> Vec<Output> + Send + Sync>;

/// A function with a declared, runtime-checked shape.
#[derive(Clone)]
pub struct DynamicFunction {
    inputs: usize,
    outputs: Vec<Slot>,
    body: Body,
}

impl DynamicFunction {
    /// Declare a function taking `inputs` arguments and producing `outputs`.
    pub fn new<F>(inputs: usize, outputs: Vec<Slot>, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Vec<Output> + Send + Sync + 'static,
    {
        Self {
            inputs,
            outputs,
            body: Arc::new(body),
        }
    }

    /// Declared input count.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Declared output slots.
    pub fn outputs(&self) -> &[Slot] {
        &self.outputs
    }

    /// Check the declaration; the first violation wins.
    fn validate(&self) -> Result<(), InvalidFunction> {
        if self.inputs != 2 {
            return Err(InvalidFunction::InvalidParameterCount { got: self.inputs });
        }
        if self.outputs.len() != 2 {
            return Err(InvalidFunction::InvalidReturnCount {
                got: self.outputs.len(),
            });
        }
        if self.outputs[1] != Slot::Error {
            return Err(InvalidFunction::MissingErrorReturn);
        }
        Ok(())
    }
}

impl fmt::Debug for DynamicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicFunction")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A candidate of unknown shape.
#[derive(Debug, Clone)]
pub enum DynamicValue {
    /// Nothing at all.
    Nil,
    /// Plain data; never callable.
    Value(Value),
    /// A callable with a declared shape.
    Function(DynamicFunction),
}

impl From<DynamicFunction> for DynamicValue {
    fn from(function: DynamicFunction) -> Self {
        DynamicValue::Function(function)
    }
}

impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        DynamicValue::Value(value)
    }
}

/// Marker for runtime-shaped candidates.
pub struct Dynamic;

impl IntoHandler<Dynamic> for DynamicValue {
    fn into_handler(self) -> Result<Arc<dyn Handler>, InvalidFunction> {
        match self {
            DynamicValue::Nil | DynamicValue::Value(_) => Err(InvalidFunction::NotAFunction),
            DynamicValue::Function(function) => function.into_handler(),
        }
    }
}

impl IntoHandler<Dynamic> for DynamicFunction {
    fn into_handler(self) -> Result<Arc<dyn Handler>, InvalidFunction> {
        self.validate()?;
        Ok(Arc::new(DynamicHandler { body: self.body }))
    }
}

/// Validated dynamic function. Context is always `null`.
struct DynamicHandler {
    body: Body,
}

impl Handler for DynamicHandler {
    fn call(&self, raw_params: &[u8]) -> Result<Bytes, InvokeError> {
        let params: Value = JsonCodec::decode(raw_params)
            .map_err(|e| InvokeError::params_unmarshal(raw_params, e))?;

        let mut outputs = (self.body)(vec![Value::Null, params]).into_iter();
        match (outputs.next(), outputs.next(), outputs.next()) {
            (Some(Output::Value(_)), Some(Output::Error(Some(err))), None) => {
                Err(InvokeError::Handler(err))
            }
            (Some(Output::Value(data)), Some(Output::Error(None)), None) => {
                JsonCodec::encode(&data)
                    .map(Bytes::from)
                    .map_err(InvokeError::ResultEncode)
            }
            _ => Err(InvokeError::ReturnShape),
        }
    }
}
