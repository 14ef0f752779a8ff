//! Discovery server: one task per subscriber session.
//!
//! # Responsibilities
//! - Register sessions and drive their state machines
//! - Answer subscription, ACK and NACK requests
//! - Push every newly published snapshot to every live session
//! - Tear sessions down on disconnect or shutdown

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::discovery::protocol::{DiscoveryRequest, DiscoveryResponse, ResourceType};
use crate::discovery::session::{Session, SessionId, SessionInfo};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::snapshot::SnapshotStore;

/// Server side of a subscriber's bidirectional channel.
pub struct SubscriberChannel {
    pub requests: mpsc::Receiver<DiscoveryRequest>,
    pub responses: mpsc::Sender<DiscoveryResponse>,
}

/// Subscriber side of an in-process channel created by [`DiscoveryServer::connect`].
pub struct Subscriber {
    requests: mpsc::Sender<DiscoveryRequest>,
    responses: mpsc::Receiver<DiscoveryResponse>,
}

impl Subscriber {
    /// Send a raw request. Fails once the session has closed.
    pub async fn send(&self, request: DiscoveryRequest) -> Result<(), ChannelClosed> {
        self.requests.send(request).await.map_err(|_| ChannelClosed)
    }

    pub async fn subscribe(&self, type_url: ResourceType) -> Result<(), ChannelClosed> {
        self.send(DiscoveryRequest::subscribe(type_url)).await
    }

    pub async fn ack(&self, response: &DiscoveryResponse) -> Result<(), ChannelClosed> {
        self.send(DiscoveryRequest::ack(response)).await
    }

    pub async fn nack(&self, response: &DiscoveryResponse, detail: &str) -> Result<(), ChannelClosed> {
        self.send(DiscoveryRequest::nack(response, detail)).await
    }

    /// Next push from the server; `None` once the session is gone.
    pub async fn recv(&mut self) -> Option<DiscoveryResponse> {
        self.responses.recv().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("discovery session closed")]
pub struct ChannelClosed;

/// Serves the single configuration group to every connected subscriber.
pub struct DiscoveryServer {
    store: Arc<SnapshotStore>,
    sessions: DashMap<SessionId, SessionInfo>,
    shutdown: Shutdown,
    channel_capacity: usize,
}

impl DiscoveryServer {
    pub fn new(store: Arc<SnapshotStore>, channel_capacity: usize) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            shutdown: Shutdown::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Share an existing coordinator instead of the server's own.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Live sessions, ordered by id.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close every session.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Open an in-process session and spawn its task.
    pub fn connect(self: &Arc<Self>) -> Subscriber {
        let (req_tx, req_rx) = mpsc::channel(self.channel_capacity);
        let (resp_tx, resp_rx) = mpsc::channel(self.channel_capacity);

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server
                .serve(SubscriberChannel {
                    requests: req_rx,
                    responses: resp_tx,
                })
                .await;
        });

        Subscriber {
            requests: req_tx,
            responses: resp_rx,
        }
    }

    /// Drive one session until its channel closes or the server shuts down.
    pub async fn serve(&self, channel: SubscriberChannel) {
        let SubscriberChannel {
            mut requests,
            responses,
        } = channel;

        let mut session = Session::new();
        let id = session.id();
        let mut versions = self.store.subscribe();
        let shutdown = self.shutdown.signalled();
        tokio::pin!(shutdown);

        // Everything up to now is covered by the initial subscription push.
        versions.borrow_and_update();

        self.sessions.insert(id, session.info());
        metrics::set_discovery_sessions(self.sessions.len());
        tracing::info!(session = %id, "Subscriber connected");

        loop {
            let outgoing = tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => {
                        let snapshot = self.store.current();
                        session.on_request(request, snapshot.as_deref()).into_iter().collect::<Vec<_>>()
                    }
                    None => {
                        tracing::debug!(session = %id, "Subscriber closed its channel");
                        break;
                    }
                },
                changed = versions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    versions.borrow_and_update();
                    match self.store.current() {
                        Some(snapshot) => session.on_publish(&snapshot),
                        None => Vec::new(),
                    }
                }
                _ = &mut shutdown => {
                    tracing::debug!(session = %id, "Discovery shutdown");
                    break;
                }
            };

            if !self.deliver(id, &responses, outgoing).await {
                break;
            }
            self.sessions.insert(id, session.info());
        }

        session.close();
        self.sessions.remove(&id);
        metrics::set_discovery_sessions(self.sessions.len());
        tracing::info!(session = %id, "Subscriber disconnected");
    }

    /// Send pushes in order; false when the subscriber is gone.
    async fn deliver(
        &self,
        id: SessionId,
        responses: &mpsc::Sender<DiscoveryResponse>,
        outgoing: Vec<DiscoveryResponse>,
    ) -> bool {
        for response in outgoing {
            let type_url = response.type_url;
            let version = response.version_info;
            if responses.send(response).await.is_err() {
                tracing::warn!(session = %id, resource = %type_url, "Subscriber channel broken");
                return false;
            }
            metrics::record_discovery_push(type_url.as_str());
            tracing::debug!(session = %id, resource = %type_url, version, "Pushed snapshot");
        }
        true
    }
}
