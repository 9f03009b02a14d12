//! Request/response types shared by the server, middleware and module handlers

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::errors::HttpError;

/// Response type produced by handlers
pub type HostResponse = Response<Full<Bytes>>;

/// Future returned by a route handler
pub type HandlerFuture = BoxFuture<'static, Result<HostResponse, HttpError>>;

/// Type-erased route handler
pub type RouteHandler = Arc<dyn Fn(HostRequest) -> HandlerFuture + Send + Sync>;

/// A request after its body has been collected
#[derive(Debug, Clone)]
pub struct HostRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// Raw body; taken by the first body parser that runs
    pub body: Option<Bytes>,
    /// Parsed JSON body, set by [`JsonBodyParser`](super::JsonBodyParser)
    pub json: Option<Value>,
    pub request_id: String,
}

impl HostRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Some(Bytes::new()),
            json: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Attach a JSON body with a matching content type
    pub fn with_json(mut self, value: &Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(value.to_string()));
        self
    }

    /// Attach a raw body
    pub fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Some(body.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Wrap an async closure as a [`RouteHandler`]
pub fn handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(HostRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HostResponse, HttpError>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Build a JSON response
pub fn json_response(status: StatusCode, body: &Value) -> HostResponse {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build an HTML response
pub fn html_response(status: StatusCode, body: String) -> HostResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Liveness handler acknowledging that `module` is mounted
pub fn ping_handler(module: &str) -> RouteHandler {
    let module = module.to_string();
    handler(move |_req| {
        let module = module.clone();
        async move {
            Ok(json_response(
                StatusCode::OK,
                &serde_json::json!({ "ok": true, "module": module }),
            ))
        }
    })
}
