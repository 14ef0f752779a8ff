//! Request dispatch for the invocation surface.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode};
use tokio::task::JoinError;

use crate::invoker::registry::{handler_name, FunctionCatalog, Handler};
use crate::invoker::response::{
    ErrorResponse, FunctionsResponse, InvocationResponse, Payload, PingResponse, Registration,
};
use crate::manifest::Manifest;
use crate::observability::metrics;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Maps manifest paths to registered handlers.
///
/// The manifest sits behind an [`ArcSwap`] so a reload can replace it without
/// blocking in-flight lookups.
pub struct InvocationRouter {
    manifest: Arc<ArcSwap<Manifest>>,
    catalog: Arc<dyn FunctionCatalog>,
    timeout: Option<Duration>,
}

impl InvocationRouter {
    pub fn new(manifest: Arc<ArcSwap<Manifest>>, catalog: Arc<dyn FunctionCatalog>) -> Self {
        Self {
            manifest,
            catalog,
            timeout: None,
        }
    }

    /// Bound each invocation; `None` waits for the handler indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn manifest(&self) -> Arc<Manifest> {
        self.manifest.load_full()
    }

    pub async fn handle(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> InvocationResponse {
        let start = Instant::now();
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            request_id = request_id.as_deref().unwrap_or("-"),
            method = %method,
            path = %path,
            authorization = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>"),
            "Invocation request"
        );

        let (function, response) = self.dispatch(method, path, body).await;
        metrics::record_invocation(
            function.as_deref().unwrap_or("none"),
            response.status.as_u16(),
            start,
        );
        response.with_request_id(request_id)
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Bytes,
    ) -> (Option<String>, InvocationResponse) {
        if *method == Method::GET {
            match path {
                "" | "/" => return (None, self.list()),
                "/ping" => return (None, InvocationResponse::ok(Payload::Pong(PingResponse::pong()))),
                _ => {}
            }
        }

        if *method != Method::POST {
            tracing::debug!(method = %method, path = %path, "Rejected non-POST invocation");
            return (
                None,
                failure(
                    StatusCode::METHOD_NOT_ALLOWED,
                    format!("Invalid method '{}'; functions require POST", method),
                    path,
                ),
            );
        }

        let name = {
            let manifest = self.manifest.load();
            let Some(entry) = manifest.entry(path) else {
                tracing::warn!(path = %path, "No function configured");
                return (
                    None,
                    failure(
                        StatusCode::NOT_FOUND,
                        format!("No function configured for path '{}'", path),
                        path,
                    ),
                );
            };
            handler_name(&entry.handler)
        };

        let Some(handler) = self.catalog.lookup(&name) else {
            tracing::warn!(path = %path, handler = %name, "Handler not registered");
            return (
                None,
                failure(
                    StatusCode::NOT_FOUND,
                    format!("No function implementation '{}' registered for path {}", name, path),
                    path,
                ),
            );
        };

        let response = self.invoke(handler, path, body).await;
        (Some(name), response)
    }

    fn list(&self) -> InvocationResponse {
        let functions = self
            .catalog
            .descriptors()
            .iter()
            .filter(|d| !d.internal)
            .map(Registration::from)
            .collect();
        InvocationResponse::ok(Payload::Functions(FunctionsResponse { functions }))
    }

    async fn invoke(&self, handler: Arc<dyn Handler>, path: &str, body: Bytes) -> InvocationResponse {
        let input = String::from_utf8_lossy(&body).into_owned();
        let task = tokio::task::spawn_blocking(move || handler.invoke(&body));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    // The blocking task runs to completion; its result is dropped.
                    tracing::warn!(path = %path, timeout_ms = limit.as_millis() as u64, "Invocation timed out");
                    return failure(
                        StatusCode::GATEWAY_TIMEOUT,
                        format!(
                            "Error for input '{}': invocation timed out after {}ms",
                            input,
                            limit.as_millis()
                        ),
                        path,
                    );
                }
            },
            None => task.await,
        };

        let detail = match joined {
            Ok(Ok(output)) => return InvocationResponse::ok(Payload::Output(output)),
            Ok(Err(e)) => e.to_string(),
            Err(e) => join_failure(e),
        };

        tracing::error!(path = %path, error = %detail, "Invocation failed");
        failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error for input '{}': {}", input, detail),
            path,
        )
    }
}

fn failure(status: StatusCode, message: String, path: &str) -> InvocationResponse {
    InvocationResponse::error(ErrorResponse::new(status, message, path))
}

fn join_failure(error: JoinError) -> String {
    if error.is_cancelled() {
        return "invocation cancelled".to_string();
    }
    panic_message(error.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
