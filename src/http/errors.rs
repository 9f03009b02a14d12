//! HTTP error types
//!
//! Errors raised while routing a request or running middleware, and their
//! JSON rendering.

use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

use super::types::{json_response, HostResponse};

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("No route for {0}")]
    NotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Request body too large (max: {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::InvalidJson(_) | HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            HttpError::NotFound(_) => "NOT_FOUND",
            HttpError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            HttpError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            HttpError::InvalidJson(_) => "INVALID_JSON",
            HttpError::BadRequest(_) => "BAD_REQUEST",
            HttpError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Render as a JSON error response
    pub fn to_response(&self, request_id: &str) -> HostResponse {
        json_response(
            self.status(),
            &json!({
                "error": {
                    "code": self.code(),
                    "message": self.to_string(),
                },
                "request_id": request_id,
            }),
        )
    }
}
