//! Configuration compiler.
//!
//! # Data Flow
//! ```text
//! Manifest (paths, global authorization defaults)
//!     → compile.rs
//!         fixed clusters
//!         synthesized ACL prefix route
//!         one exact route per path (merged authorization context)
//!         listener with authorization → dispatch filter chain
//!     → validation (paths, collisions, cluster references)
//!     → CompiledConfig (types.rs)
//! ```
//!
//! # Design Decisions
//! - Pure function, no I/O: the same manifest always compiles identically
//! - Fails as a whole; no partially compiled configuration escapes
//! - Context merge precedence: path-local > synthesized keys > global

pub mod compile;
pub mod types;

pub use compile::{compile, merge_extensions, CompileError};
pub use types::{
    AuthorizationFilter, BodyBuffering, Cluster, CompiledConfig, HttpFilter, Listener, MatchKind,
    ProtocolHint, Route, RouteTable,
};
