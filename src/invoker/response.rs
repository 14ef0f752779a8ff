//! Response bodies of the invocation surface.
//!
//! Field order is part of the documented JSON shape.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::invoker::registry::HandlerDescriptor;

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Structured error body shared by every failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: path.into(),
            request_id: None,
            status: status.as_u16(),
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingResponse {
    pub message: String,
    pub timestamp: String,
}

impl PingResponse {
    pub fn pong() -> Self {
        Self {
            message: "pong".to_string(),
            timestamp: timestamp(),
        }
    }
}

/// One entry of the function listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub name: String,
    pub arg: String,
    #[serde(rename = "return")]
    pub returns: String,
}

impl From<&HandlerDescriptor> for Registration {
    fn from(d: &HandlerDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            arg: d.input_type_name.clone(),
            returns: d.output_type_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionsResponse {
    pub functions: Vec<Registration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Functions(FunctionsResponse),
    Pong(PingResponse),
    Output(Value),
    Error(ErrorResponse),
}

/// Outcome of [`InvocationRouter::handle`](crate::invoker::InvocationRouter::handle).
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResponse {
    pub status: StatusCode,
    pub payload: Payload,
}

impl InvocationResponse {
    pub fn ok(payload: Payload) -> Self {
        Self {
            status: StatusCode::OK,
            payload,
        }
    }

    pub fn error(error: ErrorResponse) -> Self {
        Self {
            status: StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            payload: Payload::Error(error),
        }
    }

    /// Stamp the request id onto error bodies; successful payloads are untouched.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        if let Payload::Error(error) = &mut self.payload {
            error.request_id = request_id;
        }
        self
    }

    pub fn error_body(&self) -> Option<&ErrorResponse> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    /// The body as it goes on the wire.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.payload).unwrap_or(Value::Null)
    }
}

impl IntoResponse for InvocationResponse {
    fn into_response(self) -> Response {
        let method_not_allowed = self.status == StatusCode::METHOD_NOT_ALLOWED;
        let mut response = (self.status, Json(self.payload)).into_response();
        if method_not_allowed {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}
