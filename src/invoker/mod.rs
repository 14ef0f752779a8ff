//! Function invocation surface.
//!
//! # Data Flow
//! ```text
//! HTTP request (method, path, headers, body)
//!     → router.rs (GET listing / ping, method check, manifest lookup)
//!     → registry.rs (handler name normalization, catalog lookup)
//!     → blocking pool (decode body, run handler, encode output)
//!     → response.rs (200 output or structured error body)
//! ```
//!
//! # Design Decisions
//! - The catalog is injected as a trait object; nothing is global
//! - Handler descriptors carry type names captured at registration
//! - Every failure, panics included, becomes a structured response

pub mod functions;
pub mod registry;
pub mod response;
pub mod router;

pub use functions::builtin_registry;
pub use registry::{
    handler_name, FnHandler, FunctionCatalog, Handler, HandlerDescriptor, HandlerRegistry,
    InvocationError,
};
pub use response::{ErrorResponse, InvocationResponse, Payload, PingResponse};
pub use router::{InvocationRouter, X_REQUEST_ID};
