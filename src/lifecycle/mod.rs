//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load manifest → Check artifact → Compile → (caller) publish + bind
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger → servers stop accepting, sessions close
//!
//! Reload (reload.rs):
//!     Manifest watcher update → Compile → Publish → Swap routing manifest
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then manifest, then listeners
//! - Each fatal startup condition has its own exit code
//! - One coordinator shared by every server

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reload::{apply_manifest, run_reloads};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{bind_listener, bootstrap, Bootstrap, StartupError};
