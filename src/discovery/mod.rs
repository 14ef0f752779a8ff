//! Discovery protocol subsystem.
//!
//! # Data Flow
//! ```text
//! proxy node connects (transport.rs, or DiscoveryServer::connect in-process)
//!     → server.rs spawns a session task
//!     → session.rs decides what to push for each request
//!     → full resource lists per type (protocol.rs)
//!
//! SnapshotStore::publish
//!     → watch channel wakes every session task
//!     → each session pushes the new version independently
//! ```
//!
//! # Design Decisions
//! - Exactly one configuration group; node ids are recorded, never used for selection
//! - Full-state pushes only, no deltas
//! - Rejections are logged and answered with an immediate resend, no backoff
//! - A session only ever blocks on its own channel

pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use protocol::{DiscoveryRequest, DiscoveryResponse, ResourceType};
pub use server::{ChannelClosed, DiscoveryServer, Subscriber, SubscriberChannel};
pub use session::{Session, SessionId, SessionInfo, SessionState};
pub use transport::{discovery_router, DISCOVERY_PATH};
