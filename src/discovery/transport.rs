//! WebSocket transport for the discovery protocol.
//!
//! # Data Flow
//! ```text
//! proxy node ── text frame (DiscoveryRequest JSON) ──▶ reader ──▶ session task
//! proxy node ◀── text frame (DiscoveryResponse JSON) ── writer ◀── session task
//! ```
//!
//! # Design Decisions
//! - One JSON message per text frame
//! - Malformed frames are logged and skipped; they do not end the session
//! - Either side closing tears the whole session down

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::discovery::protocol::DiscoveryRequest;
use crate::discovery::server::{DiscoveryServer, SubscriberChannel};

pub const DISCOVERY_PATH: &str = "/v3/discovery";

/// Router exposing the discovery endpoint.
pub fn discovery_router(server: Arc<DiscoveryServer>) -> Router {
    Router::new()
        .route(DISCOVERY_PATH, get(upgrade))
        .with_state(server)
}

async fn upgrade(ws: WebSocketUpgrade, State(server): State<Arc<DiscoveryServer>>) -> Response {
    ws.on_upgrade(move |socket| bridge(server, socket))
}

async fn bridge(server: Arc<DiscoveryServer>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let capacity = server.channel_capacity();
    let (req_tx, req_rx) = mpsc::channel(capacity);
    let (resp_tx, mut resp_rx) = mpsc::channel(capacity);

    let session = tokio::spawn(async move {
        server
            .serve(SubscriberChannel {
                requests: req_rx,
                responses: resp_tx,
            })
            .await;
    });

    let writer = tokio::spawn(async move {
        while let Some(response) = resp_rx.recv().await {
            let text = match serde_json::to_string(&response) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode discovery response");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "Discovery socket error");
                break;
            }
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<DiscoveryRequest>(text.as_str()) {
                Ok(request) => {
                    if req_tx.send(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Malformed discovery request"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Dropping the request sender ends the session, which ends the writer.
    drop(req_tx);
    let _ = session.await;
    let _ = writer.await;
}
