//! Snapshot subsystem.
//!
//! # Data Flow
//! ```text
//! CompiledConfig
//!     → SnapshotStore::publish (writer lock, version + 1)
//!     → atomic swap of Arc<Snapshot>
//!     → watch channel carries the new version
//!     → discovery sessions wake up and push
//! ```
//!
//! # Design Decisions
//! - One writer at a time; readers never block (arc-swap)
//! - Only the current and the immediately previous snapshot are retained
//! - Notification is level-triggered: a slow session skips straight to the
//!   newest version instead of queueing every intermediate one

pub mod store;

pub use store::{Snapshot, SnapshotStore};
