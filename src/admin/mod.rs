//! Admin API: read-only views of the running invoker.
//!
//! Every route sits behind bearer-key authentication.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::discovery::DiscoveryServer;
use crate::invoker::InvocationRouter;

/// Shared state of the admin routes.
#[derive(Clone)]
pub struct AdminState {
    pub discovery: Arc<DiscoveryServer>,
    pub invoker: Arc<InvocationRouter>,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(
        discovery: Arc<DiscoveryServer>,
        invoker: Arc<InvocationRouter>,
        api_key: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            discovery,
            invoker,
            api_key: api_key.into(),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/snapshot", get(get_snapshot))
        .route("/admin/subscribers", get(get_subscribers))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
