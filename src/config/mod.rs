//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → InvokerConfig (validated, immutable)
//!     → sections handed to each server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the manifest hot-reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, DiscoveryConfig, InvocationConfig, InvokerConfig, ListenerConfig, LogFormat,
    ManifestConfig, ObservabilityConfig,
};
pub use validation::{validate_config, ValidationError};
