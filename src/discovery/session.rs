//! Subscriber session state machine.
//!
//! # States
//! ```text
//! Connected ──push──▶ AwaitingAck ──ack──▶ UpToDate
//!                        ▲   │ nack → resend     │
//!                        │   └───────────────────┤
//!                        └──────── publish ──────┘
//! any state ── channel closed / shutdown ──▶ Closed
//! ```
//!
//! The session is pure bookkeeping: it decides what to send, the server task
//! does the sending.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::discovery::protocol::{resources, DiscoveryRequest, DiscoveryResponse, ResourceType};
use crate::snapshot::Snapshot;

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscriber session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Registered, nothing pushed yet.
    Connected,
    /// At least one push has not been acknowledged.
    AwaitingAck,
    /// Every subscribed type acknowledged the latest version sent.
    UpToDate,
    Closed,
}

/// Per resource type bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    pub sent_version: Option<u64>,
    pub acked_version: Option<u64>,
    #[serde(skip)]
    pending_nonce: Option<String>,
}

/// Read-only view of a session for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub node_id: Option<String>,
    pub state: SessionState,
    pub resources: BTreeMap<ResourceType, ResourceState>,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    node_id: Option<String>,
    state: SessionState,
    subscriptions: BTreeMap<ResourceType, ResourceState>,
    next_nonce: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            node_id: None,
            state: SessionState::Connected,
            subscriptions: BTreeMap::new(),
            next_nonce: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn resource(&self, type_url: ResourceType) -> Option<&ResourceState> {
        self.subscriptions.get(&type_url)
    }

    /// Handle one inbound request and return the push it calls for, if any.
    pub fn on_request(
        &mut self,
        request: DiscoveryRequest,
        snapshot: Option<&Snapshot>,
    ) -> Option<DiscoveryResponse> {
        if self.state == SessionState::Closed {
            return None;
        }
        if request.node_id.is_some() {
            self.node_id = request.node_id.clone();
        }

        let type_url = request.type_url;
        let entry = self.subscriptions.entry(type_url).or_default();

        let response = match request.response_nonce {
            None => {
                tracing::debug!(session = %self.id, resource = %type_url, "Subscription request");
                snapshot.and_then(|s| self.push(type_url, s))
            }
            Some(nonce) if entry.pending_nonce.as_deref() != Some(nonce.as_str()) => {
                tracing::debug!(session = %self.id, resource = %type_url, nonce = %nonce, "Ignoring stale response nonce");
                None
            }
            Some(_) => {
                entry.pending_nonce = None;
                match request.error_detail {
                    Some(detail) => {
                        tracing::warn!(
                            session = %self.id,
                            resource = %type_url,
                            rejected_version = ?request.version_info,
                            error = %detail,
                            "Subscriber rejected configuration; resending current snapshot"
                        );
                        crate::observability::metrics::record_discovery_nack(type_url.as_str());
                        snapshot.and_then(|s| self.push(type_url, s))
                    }
                    None => {
                        entry.acked_version = request.version_info.or(entry.sent_version);
                        tracing::debug!(session = %self.id, resource = %type_url, version = ?entry.acked_version, "Subscriber acknowledged");
                        None
                    }
                }
            }
        };

        self.refresh_state();
        response
    }

    /// Pushes owed after a publish: one per subscribed type not yet at `snapshot`.
    pub fn on_publish(&mut self, snapshot: &Snapshot) -> Vec<DiscoveryResponse> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }

        let stale: Vec<ResourceType> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.sent_version != Some(snapshot.version))
            .map(|(t, _)| *t)
            .collect();

        let responses = stale
            .into_iter()
            .filter_map(|type_url| self.push(type_url, snapshot))
            .collect();

        self.refresh_state();
        responses
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            node_id: self.node_id.clone(),
            state: self.state,
            resources: self.subscriptions.clone(),
        }
    }

    fn push(&mut self, type_url: ResourceType, snapshot: &Snapshot) -> Option<DiscoveryResponse> {
        let resources = match resources(snapshot, type_url) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(session = %self.id, resource = %type_url, error = %e, "Failed to render resources");
                return None;
            }
        };

        self.next_nonce += 1;
        let nonce = self.next_nonce.to_string();

        let entry = self.subscriptions.entry(type_url).or_default();
        entry.sent_version = Some(snapshot.version);
        entry.pending_nonce = Some(nonce.clone());

        Some(DiscoveryResponse {
            type_url,
            version_info: snapshot.version,
            nonce,
            resources,
        })
    }

    fn refresh_state(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        let sent_any = self.subscriptions.values().any(|s| s.sent_version.is_some());
        let pending = self.subscriptions.values().any(|s| s.pending_nonce.is_some());

        self.state = if !sent_any {
            SessionState::Connected
        } else if pending {
            SessionState::AwaitingAck
        } else if self
            .subscriptions
            .values()
            .all(|s| s.sent_version.is_none() || s.acked_version == s.sent_version)
        {
            SessionState::UpToDate
        } else {
            SessionState::AwaitingAck
        };
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
