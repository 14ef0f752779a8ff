//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, timeout)
//!     → invoker::InvocationRouter (listing, ping, dispatch)
//!     → structured JSON response
//! ```

pub mod server;

pub use server::{serve_router, HttpServer};
