//! Handler registry and the catalog capability the router depends on.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// What a registered handler accepts and returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    pub name: String,
    pub input_type_name: String,
    pub output_type_name: String,
    /// Framework plumbing; hidden from the function listing.
    pub internal: bool,
}

/// Failure raised while decoding input for, or running, a handler.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("cannot decode input as {expected}: {source}")]
    Decode {
        expected: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Failed(String),

    #[error("cannot encode output: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A function implementation. Calls may block and may run concurrently.
pub trait Handler: Send + Sync {
    fn descriptor(&self) -> &HandlerDescriptor;

    fn invoke(&self, body: &[u8]) -> Result<Value, InvocationError>;
}

/// Read-only handler lookup injected into the router.
pub trait FunctionCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>>;

    /// Every registered handler, internal ones included.
    fn descriptors(&self) -> Vec<HandlerDescriptor>;
}

/// Derive the registry name from a fully qualified handler identifier.
///
/// Takes the last segment (`.`, `/` or `:` separated) and lowercases its
/// first character: `com.example.CreateOrder` → `createOrder`.
pub fn handler_name(identifier: &str) -> String {
    let last = identifier
        .rsplit(|c| matches!(c, '.' | '/' | ':'))
        .next()
        .unwrap_or(identifier);

    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A handler built from a typed closure.
///
/// The body is decoded as JSON into `I`; when that fails and `I` can be built
/// from a plain string, the raw text is tried instead.
pub struct FnHandler<I, O, F> {
    descriptor: HandlerDescriptor,
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F, E> FnHandler<I, O, F>
where
    I: DeserializeOwned,
    O: Serialize,
    F: Fn(I) -> Result<O, E> + Send + Sync,
    E: Display,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            descriptor: HandlerDescriptor {
                name: name.into(),
                input_type_name: type_name::<I>().to_string(),
                output_type_name: type_name::<O>().to_string(),
                internal: false,
            },
            func,
            _types: PhantomData,
        }
    }

    pub fn internal(mut self) -> Self {
        self.descriptor.internal = true;
        self
    }

    fn decode(&self, body: &[u8]) -> Result<I, InvocationError> {
        match serde_json::from_slice::<I>(body) {
            Ok(input) => Ok(input),
            Err(json_err) => match std::str::from_utf8(body) {
                Ok(text) => serde_json::from_value(Value::String(text.to_string())).map_err(|_| {
                    InvocationError::Decode {
                        expected: self.descriptor.input_type_name.clone(),
                        source: json_err,
                    }
                }),
                Err(_) => Err(InvocationError::Decode {
                    expected: self.descriptor.input_type_name.clone(),
                    source: json_err,
                }),
            },
        }
    }
}

impl<I, O, F, E> Handler for FnHandler<I, O, F>
where
    I: DeserializeOwned,
    O: Serialize,
    F: Fn(I) -> Result<O, E> + Send + Sync,
    E: Display,
{
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn invoke(&self, body: &[u8]) -> Result<Value, InvocationError> {
        let input = self.decode(body)?;
        let output = (self.func)(input).map_err(|e| InvocationError::Failed(e.to_string()))?;
        serde_json::to_value(output).map_err(InvocationError::Encode)
    }
}

/// In-memory catalog, populated at startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its descriptor name, replacing any previous one.
    pub fn insert(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        let name = handler.descriptor().name.clone();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(handler = %name, "Handler registered twice; keeping the latest");
        }
        self
    }

    /// Register a typed closure.
    pub fn register<I, O, F, E>(&mut self, name: &str, func: F) -> &mut Self
    where
        I: DeserializeOwned + 'static,
        O: Serialize + 'static,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        E: Display + 'static,
    {
        self.insert(Arc::new(FnHandler::new(name, func)))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl FunctionCatalog for HandlerRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    fn descriptors(&self) -> Vec<HandlerDescriptor> {
        self.handlers.values().map(|h| h.descriptor().clone()).collect()
    }
}
