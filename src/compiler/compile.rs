//! Manifest → proxy configuration compilation.

use thiserror::Error;

use crate::compiler::types::{
    AuthorizationFilter, BodyBuffering, Cluster, CompiledConfig, HttpFilter, Listener, MatchKind,
    ProtocolHint, Route,
};
use crate::manifest::{Manifest, OrderedMap};

pub const INVOKER_CLUSTER: &str = "invoker";
pub const ACL_API_CLUSTER: &str = "acl_api";
pub const AUTHZ_CLUSTER: &str = "authz";

pub const ACL_PREFIX: &str = "/acl/";

pub const SERVICE_PATH_KEY: &str = "service_path";
pub const OBJECT_ID_PTR_KEY: &str = "objectid_ptr";

const LISTENER_NAME: &str = "ingress_http";
const LISTENER_ADDRESS: &str = "0.0.0.0";
const LISTENER_PORT: u16 = 18000;
const ROUTE_TABLE: &str = "local_route";

const AUTHZ_FILTER: &str = "ext_authz";
const DISPATCH_FILTER: &str = "router";
const AUTHZ_TIMEOUT_MS: u64 = 1000;
const AUTHZ_MAX_REQUEST_BYTES: u32 = 64 * 1024;

const CONNECT_TIMEOUT_MS: u64 = 1000;

/// Errors that reject a manifest as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("path '{path}' is invalid: paths must be non-empty and start with '/'")]
    InvalidPath { path: String },

    #[error("path '{path}' has no handler")]
    MissingHandler { path: String },

    #[error("path '{path}' collides with another route on the same literal match")]
    DuplicateRoute { path: String },

    #[error("route for path '{path}' targets unknown cluster '{cluster}'")]
    UnknownCluster { path: String, cluster: String },
}

/// Compile a manifest into a complete proxy configuration.
///
/// Deterministic: the same manifest always yields an identical config, with
/// routes in manifest order after the synthesized ACL route.
pub fn compile(manifest: &Manifest) -> Result<CompiledConfig, CompileError> {
    let clusters = vec![
        cluster(INVOKER_CLUSTER, "invoker", 8080, ProtocolHint::Http1),
        cluster(ACL_API_CLUSTER, "authz", 8081, ProtocolHint::Http1),
        cluster(AUTHZ_CLUSTER, "authz", 8080, ProtocolHint::Http2),
    ];

    let mut routes = Vec::with_capacity(manifest.paths.len() + 1);
    routes.push(acl_route());

    for (path, entry) in manifest.paths.iter() {
        if path.is_empty() || !path.starts_with('/') {
            return Err(CompileError::InvalidPath { path: path.to_string() });
        }
        if entry.handler.trim().is_empty() {
            return Err(CompileError::MissingHandler { path: path.to_string() });
        }

        routes.push(Route {
            match_kind: MatchKind::Exact,
            match_value: path.to_string(),
            cluster: INVOKER_CLUSTER.to_string(),
            context_extensions: merge_extensions(manifest, path),
        });
    }

    let config = CompiledConfig {
        clusters,
        routes,
        listener: listener(),
    };
    validate(&config)?;

    tracing::debug!(
        clusters = config.clusters.len(),
        routes = config.routes.len(),
        "Manifest compiled"
    );

    Ok(config)
}

/// Build the authorization context for one manifest path.
///
/// Layers, lowest first: global extensions, `service_path`, `objectid_ptr`
/// (only when the path declares a pointer), path-local extensions.
pub fn merge_extensions(manifest: &Manifest, path: &str) -> OrderedMap<String> {
    let mut merged = manifest.authorization.extensions.clone();
    merged.insert(SERVICE_PATH_KEY, path.to_string());

    if let Some(entry) = manifest.entry(path) {
        if let Some(pointer) = &entry.authorization.object_id_pointer {
            merged.insert(OBJECT_ID_PTR_KEY, pointer.clone());
        }
        merged.overlay(&entry.authorization.extensions);
    }

    merged
}

fn validate(config: &CompiledConfig) -> Result<(), CompileError> {
    for (i, route) in config.routes.iter().enumerate() {
        if config.routes[..i]
            .iter()
            .any(|earlier| earlier.match_value == route.match_value)
        {
            return Err(CompileError::DuplicateRoute {
                path: route.match_value.clone(),
            });
        }

        if config.cluster(&route.cluster).is_none() {
            return Err(CompileError::UnknownCluster {
                path: route.match_value.clone(),
                cluster: route.cluster.clone(),
            });
        }
    }

    for filter in &config.listener.http_filters {
        if let HttpFilter::Authorization(authz) = filter {
            if config.cluster(&authz.cluster).is_none() {
                return Err(CompileError::UnknownCluster {
                    path: config.listener.name.clone(),
                    cluster: authz.cluster.clone(),
                });
            }
        }
    }

    Ok(())
}

fn cluster(name: &str, host: &str, port: u16, protocol_hint: ProtocolHint) -> Cluster {
    Cluster {
        name: name.to_string(),
        upstream_host: host.to_string(),
        upstream_port: port,
        protocol_hint,
        connect_timeout_ms: CONNECT_TIMEOUT_MS,
        discovery: "strict_dns",
        lb_policy: "round_robin",
    }
}

fn acl_route() -> Route {
    let context_extensions = [
        ("namespace_object", "acl"),
        ("namespace_service", "api"),
        (SERVICE_PATH_KEY, "/acl/{objectId}"),
        ("relation", "owner"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect();

    Route {
        match_kind: MatchKind::Prefix,
        match_value: ACL_PREFIX.to_string(),
        cluster: ACL_API_CLUSTER.to_string(),
        context_extensions,
    }
}

fn listener() -> Listener {
    Listener {
        name: LISTENER_NAME.to_string(),
        address: LISTENER_ADDRESS.to_string(),
        port: LISTENER_PORT,
        stat_prefix: LISTENER_NAME.to_string(),
        http_filters: vec![
            HttpFilter::Authorization(AuthorizationFilter {
                name: AUTHZ_FILTER.to_string(),
                cluster: AUTHZ_CLUSTER.to_string(),
                timeout_ms: AUTHZ_TIMEOUT_MS,
                include_peer_certificate: true,
                body: BodyBuffering {
                    max_request_bytes: AUTHZ_MAX_REQUEST_BYTES,
                    allow_partial_message: false,
                    pack_as_bytes: false,
                },
            }),
            HttpFilter::Dispatch {
                name: DISPATCH_FILTER.to_string(),
            },
        ],
        route_table: ROUTE_TABLE.to_string(),
    }
}
