//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use faas_invoker::config::ListenerConfig;
use faas_invoker::discovery::{discovery_router, DiscoveryServer, DISCOVERY_PATH};
use faas_invoker::http::{serve_router, HttpServer};
use faas_invoker::invoker::{builtin_registry, InvocationRouter};
use faas_invoker::lifecycle::{bind_listener, Shutdown};
use faas_invoker::manifest::Manifest;
use faas_invoker::snapshot::SnapshotStore;

pub const MANIFEST: &str = r#"
location: file:///opt/functions/demo-functions-1.0.jar
authorization:
  extensions:
    namespace_service: demo
paths:
  /upper:
    handler: com.example.functions.Uppercase
  /reverse:
    handler: com.example.functions.Reverse
    authorization:
      objectIdPointer: /id
  /count:
    handler: com.example.functions.WordCount
  /missing:
    handler: com.example.functions.NotDeployed
"#;

pub fn manifest(yaml: &str) -> Manifest {
    Manifest::from_yaml(yaml).unwrap()
}

/// A running invoker: invocation and discovery servers on ephemeral ports.
pub struct TestInvoker {
    pub http: SocketAddr,
    pub discovery: SocketAddr,
    pub store: Arc<SnapshotStore>,
    pub routing: Arc<ArcSwap<Manifest>>,
    pub server: Arc<DiscoveryServer>,
    pub shutdown: Shutdown,
}

impl TestInvoker {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http, path)
    }

    pub fn discovery_url(&self) -> String {
        format!("ws://{}{}", self.discovery, DISCOVERY_PATH)
    }
}

impl Drop for TestInvoker {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start(yaml: &str) -> TestInvoker {
    start_with_timeout(yaml, None).await
}

pub async fn start_with_timeout(yaml: &str, timeout: Option<Duration>) -> TestInvoker {
    let manifest = manifest(yaml);
    let shutdown = Shutdown::new();

    let store = Arc::new(SnapshotStore::new());
    store.publish(faas_invoker::compiler::compile(&manifest).unwrap());

    let routing = Arc::new(ArcSwap::from_pointee(manifest));
    let invoker = Arc::new(
        InvocationRouter::new(Arc::clone(&routing), Arc::new(builtin_registry()))
            .with_timeout(timeout),
    );
    let server = Arc::new(DiscoveryServer::new(Arc::clone(&store), 8).with_shutdown(shutdown.clone()));

    let http_listener = bind_listener("invocation", "127.0.0.1:0").await.unwrap();
    let discovery_listener = bind_listener("discovery", "127.0.0.1:0").await.unwrap();
    let http = http_listener.local_addr().unwrap();
    let discovery = discovery_listener.local_addr().unwrap();

    let config = ListenerConfig {
        bind_address: http.to_string(),
        max_body_bytes: 64 * 1024,
        request_timeout_secs: None,
    };
    tokio::spawn(HttpServer::new(&config, invoker).run(http_listener, shutdown.clone()));
    tokio::spawn(serve_router(
        "discovery",
        discovery_listener,
        discovery_router(Arc::clone(&server)),
        shutdown.clone(),
    ));

    TestInvoker {
        http,
        discovery,
        store,
        routing,
        server,
        shutdown,
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
