//! Discovery protocol messages.
//!
//! Every response carries the full resource list for its type; there is no
//! delta encoding. Versions are the snapshot versions of the store.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::Snapshot;

/// Resource families a subscriber can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Clusters,
    Routes,
    Listeners,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Clusters,
        ResourceType::Routes,
        ResourceType::Listeners,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Clusters => "clusters",
            ResourceType::Routes => "routes",
            ResourceType::Listeners => "listeners",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscriber → server.
///
/// Without `response_nonce` the request (re)subscribes to `type_url`. With a
/// nonce it acknowledges that push, or rejects it when `error_detail` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub type_url: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_info: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl DiscoveryRequest {
    pub fn subscribe(type_url: ResourceType) -> Self {
        Self {
            type_url,
            version_info: None,
            response_nonce: None,
            error_detail: None,
            node_id: None,
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Acknowledge a push.
    pub fn ack(response: &DiscoveryResponse) -> Self {
        Self {
            type_url: response.type_url,
            version_info: Some(response.version_info),
            response_nonce: Some(response.nonce.clone()),
            error_detail: None,
            node_id: None,
        }
    }

    /// Reject a push.
    pub fn nack(response: &DiscoveryResponse, detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::ack(response)
        }
    }
}

/// Server → subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    pub type_url: ResourceType,
    pub version_info: u64,
    pub nonce: String,
    pub resources: Vec<Value>,
}

/// Render one resource family of a snapshot.
pub fn resources(snapshot: &Snapshot, type_url: ResourceType) -> Result<Vec<Value>, serde_json::Error> {
    let config = &snapshot.config;
    match type_url {
        ResourceType::Clusters => config.clusters.iter().map(serde_json::to_value).collect(),
        ResourceType::Routes => Ok(vec![serde_json::to_value(config.route_table())?]),
        ResourceType::Listeners => Ok(vec![serde_json::to_value(&config.listener)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::manifest::{Manifest, PathEntry};

    fn snapshot() -> Snapshot {
        let manifest = Manifest {
            paths: [(
                "/hello",
                PathEntry {
                    handler: "x.Hello".into(),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        Snapshot {
            version: 7,
            config: compile(&manifest).unwrap(),
        }
    }

    #[test]
    fn request_wire_format() {
        let req: DiscoveryRequest =
            serde_json::from_str(r#"{"type_url":"routes","node_id":"edge-1"}"#).unwrap();
        assert_eq!(req.type_url, ResourceType::Routes);
        assert_eq!(req.node_id.as_deref(), Some("edge-1"));
        assert!(req.response_nonce.is_none());

        let json = serde_json::to_string(&DiscoveryRequest::subscribe(ResourceType::Clusters)).unwrap();
        assert_eq!(json, r#"{"type_url":"clusters"}"#);
    }

    #[test]
    fn nack_carries_detail() {
        let response = DiscoveryResponse {
            type_url: ResourceType::Listeners,
            version_info: 3,
            nonce: "9".into(),
            resources: vec![],
        };
        let nack = DiscoveryRequest::nack(&response, "bad filter");
        assert_eq!(nack.version_info, Some(3));
        assert_eq!(nack.response_nonce.as_deref(), Some("9"));
        assert_eq!(nack.error_detail.as_deref(), Some("bad filter"));
    }

    #[test]
    fn cluster_resources() {
        let clusters = resources(&snapshot(), ResourceType::Clusters).unwrap();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0]["name"], "invoker");
    }

    #[test]
    fn route_table_resource() {
        let routes = resources(&snapshot(), ResourceType::Routes).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0]["name"], "local_route");

        let table = &routes[0]["virtual_hosts"][0]["routes"];
        assert_eq!(table[0]["match_value"], "/acl/");
        assert_eq!(table[1]["match_value"], "/hello");
        assert_eq!(table[1]["context_extensions"]["service_path"], "/hello");
    }

    #[test]
    fn listener_resource() {
        let listeners = resources(&snapshot(), ResourceType::Listeners).unwrap();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0]["route_table"], "local_route");
        assert_eq!(listeners[0]["http_filters"][0]["kind"], "authorization");
    }
}
