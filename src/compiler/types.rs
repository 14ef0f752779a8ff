//! Compiled proxy configuration.
//!
//! Everything here is plain data: it serializes directly into the resources
//! pushed to proxy nodes and compares structurally for tests.

use serde::Serialize;

use crate::manifest::OrderedMap;

/// Output of the compiler: the whole configuration graph for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledConfig {
    pub clusters: Vec<Cluster>,
    /// Evaluated in order; the first match wins.
    pub routes: Vec<Route>,
    pub listener: Listener,
}

impl CompiledConfig {
    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    /// Route a request path the way a proxy node would.
    pub fn match_route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    /// The route table referenced by the listener.
    pub fn route_table(&self) -> RouteTable<'_> {
        RouteTable {
            name: &self.listener.route_table,
            virtual_hosts: vec![VirtualHost {
                name: VIRTUAL_HOST,
                domains: &["*"],
                routes: &self.routes,
            }],
        }
    }
}

pub(crate) const VIRTUAL_HOST: &str = "backend";

/// Application protocol spoken to an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolHint {
    Http1,
    Http2,
}

/// A named upstream target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub upstream_host: String,
    pub upstream_port: u16,
    pub protocol_hint: ProtocolHint,
    pub connect_timeout_ms: u64,
    pub discovery: &'static str,
    pub lb_policy: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
}

/// A match rule bound to a cluster, carrying authorization context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub match_kind: MatchKind,
    pub match_value: String,
    pub cluster: String,
    /// Opaque key/value bundle handed to the authorization service.
    pub context_extensions: OrderedMap<String>,
}

impl Route {
    pub fn matches(&self, path: &str) -> bool {
        match self.match_kind {
            MatchKind::Exact => path == self.match_value,
            MatchKind::Prefix => path.starts_with(&self.match_value),
        }
    }
}

/// The single ingress listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listener {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub stat_prefix: String,
    /// Applied in order for every request.
    pub http_filters: Vec<HttpFilter>,
    /// Name of the route table served under the routes resource type.
    pub route_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HttpFilter {
    Authorization(AuthorizationFilter),
    Dispatch { name: String },
}

impl HttpFilter {
    pub fn name(&self) -> &str {
        match self {
            HttpFilter::Authorization(f) => &f.name,
            HttpFilter::Dispatch { name } => name,
        }
    }
}

/// External authorization filter settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationFilter {
    pub name: String,
    pub cluster: String,
    pub timeout_ms: u64,
    pub include_peer_certificate: bool,
    pub body: BodyBuffering,
}

/// How much of the request body the authorization service gets to inspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyBuffering {
    pub max_request_bytes: u32,
    /// When false, bodies over the limit are rejected instead of truncated.
    pub allow_partial_message: bool,
    pub pack_as_bytes: bool,
}

/// Serialized view of the route table.
#[derive(Debug, Serialize)]
pub struct RouteTable<'a> {
    pub name: &'a str,
    pub virtual_hosts: Vec<VirtualHost<'a>>,
}

#[derive(Debug, Serialize)]
pub struct VirtualHost<'a> {
    pub name: &'a str,
    pub domains: &'a [&'a str],
    pub routes: &'a [Route],
}
