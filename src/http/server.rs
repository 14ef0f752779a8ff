//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the invocation handler
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Bind server to listener
//! - Hand every request to the invocation router
//! - Rewrite rejections produced by the layers into the JSON error body

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::invoker::{ErrorResponse, InvocationResponse, InvocationRouter, X_REQUEST_ID};
use crate::lifecycle::Shutdown;

/// HTTP server for the invocation surface.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ListenerConfig, invoker: Arc<InvocationRouter>) -> Self {
        Self {
            router: Self::build_router(config, invoker),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, invoker: Arc<InvocationRouter>) -> Router {
        let mut router = Router::new()
            .fallback(invoke_handler)
            .with_state(invoker)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes));
        if let Some(secs) = config.request_timeout_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }
        router
            .layer(middleware::from_fn(structured_rejections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        serve_router("invocation", listener, self.router, shutdown).await
    }
}

/// Serve `router` on `listener` until the shutdown coordinator fires.
pub async fn serve_router(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(server = name, address = %addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.signalled())
        .await?;

    tracing::info!(server = name, "HTTP server stopped");
    Ok(())
}

async fn invoke_handler(
    State(invoker): State<Arc<InvocationRouter>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> InvocationResponse {
    invoker.handle(&method, uri.path(), &headers, body).await
}

/// Body-limit and timeout layers answer with plain text or an empty body.
/// Replace those with the error body every other failure uses.
async fn structured_rejections(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;
    if is_json(&response) {
        return response;
    }

    let error = match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ErrorResponse::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body for path '{}' exceeds the configured limit", path),
            &path,
        ),
        StatusCode::REQUEST_TIMEOUT => {
            tracing::warn!(path = %path, "Request deadline expired");
            ErrorResponse::new(
                StatusCode::GATEWAY_TIMEOUT,
                format!("Request for path '{}' timed out", path),
                &path,
            )
        }
        _ => return response,
    };
    InvocationResponse::error(error)
        .with_request_id(request_id)
        .into_response()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{builtin_registry, HandlerRegistry};
    use crate::manifest::{Manifest, PathEntry};
    use serde_json::Value;
    use arc_swap::ArcSwap;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    fn manifest() -> Manifest {
        let entries = [("/upper", "com.example.Uppercase"), ("/slow", "com.example.Slow")];
        Manifest {
            paths: entries
                .into_iter()
                .map(|(path, handler)| {
                    (
                        path,
                        PathEntry {
                            handler: handler.to_string(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    fn server_with(config: ListenerConfig) -> Router {
        let mut registry = builtin_registry();
        registry.register("slow", |v: Value| {
            std::thread::sleep(Duration::from_millis(1500));
            Ok::<_, String>(v)
        });
        let invoker = InvocationRouter::new(
            Arc::new(ArcSwap::from_pointee(manifest())),
            Arc::new(registry),
        );
        HttpServer::new(&config, Arc::new(invoker)).into_router()
    }

    fn server(max_body_bytes: usize) -> Router {
        server_with(ListenerConfig {
            max_body_bytes,
            ..Default::default()
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invokes_through_the_stack() {
        let response = server(1024)
            .oneshot(Request::post("/upper").body(Body::from("hello")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, "HELLO");
    }

    #[tokio::test]
    async fn error_body_carries_generated_request_id() {
        let response = server(1024)
            .oneshot(Request::post("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let json = body_json(response).await;
        assert_eq!(json["requestId"], header.as_str());
    }

    #[tokio::test]
    async fn method_not_allowed_has_allow_header() {
        let response = server(1024)
            .oneshot(Request::delete("/upper").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "POST");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let response = server(8)
            .oneshot(
                Request::post("/upper")
                    .header("content-length", "32")
                    .body(Body::from("x".repeat(32)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let json = body_json(response).await;
        assert_eq!(json["status"], 413);
        assert_eq!(json["error"], "Payload Too Large");
        assert_eq!(json["path"], "/upper");
        assert_eq!(json["requestId"], header.as_str());
    }

    #[tokio::test]
    async fn oversized_stream_without_length_is_json() {
        let chunks = futures_util::stream::iter(
            (0..4).map(|_| Ok::<_, std::io::Error>(Bytes::from_static(b"xxxxxxxx"))),
        );
        let response = server(8)
            .oneshot(
                Request::post("/upper")
                    .body(Body::from_stream(chunks))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["status"], 413);
        assert_eq!(json["path"], "/upper");
    }

    #[tokio::test]
    async fn no_request_deadline_by_default() {
        assert!(ListenerConfig::default().request_timeout_secs.is_none());

        let response = server_with(ListenerConfig::default())
            .oneshot(Request::post("/slow").body(Body::from("\"late\"")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, "late");
    }

    #[tokio::test]
    async fn request_deadline_answers_structured_504() {
        let config = ListenerConfig {
            request_timeout_secs: Some(1),
            ..Default::default()
        };
        let response = server_with(config)
            .oneshot(Request::post("/slow").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = body_json(response).await;
        assert_eq!(json["status"], 504);
        assert_eq!(json["error"], "Gateway Timeout");
        assert_eq!(json["path"], "/slow");
        assert!(json["requestId"].is_string());
    }
}
