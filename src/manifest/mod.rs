//! Manifest subsystem.
//!
//! # Data Flow
//! ```text
//! manifest.yaml
//!     → loader.rs (read & deserialize)
//!     → Manifest (immutable, path order preserved)
//!     → compiler (proxy configuration) and invoker (request routing)
//!
//! On change (watch enabled):
//!     watcher.rs detects modification
//!     → loader.rs parses the new file
//!     → caller recompiles and publishes a fresh snapshot
//! ```
//!
//! # Design Decisions
//! - The manifest is never mutated in place; a reload produces a new value
//! - Key order is significant and preserved through `OrderedMap`

pub mod loader;
pub mod model;
pub mod ordered;
pub mod watcher;

pub use loader::{load_manifest, resolve_artifact, ManifestError};
pub use model::{AuthEntry, GlobalAuthorization, Manifest, PathEntry};
pub use ordered::OrderedMap;
pub use watcher::ManifestWatcher;
