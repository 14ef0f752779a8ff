//! FaaS invoker library.
//!
//! Compiles a function manifest into proxy configuration, serves it to proxy
//! nodes over a discovery protocol, and invokes the functions the manifest
//! routes to.

// Manifest → configuration pipeline
pub mod compiler;
pub mod manifest;
pub mod snapshot;

// Serving
pub mod admin;
pub mod discovery;
pub mod http;
pub mod invoker;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::InvokerConfig;
pub use discovery::DiscoveryServer;
pub use http::HttpServer;
pub use invoker::InvocationRouter;
pub use lifecycle::Shutdown;
pub use snapshot::SnapshotStore;
