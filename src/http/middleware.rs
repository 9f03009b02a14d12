//! Prefix-scoped middleware
//!
//! Middleware runs before the route handler for every request whose path
//! falls under the prefix it was installed at.

use std::sync::Arc;
use tracing::debug;

use super::errors::HttpError;
use super::types::HostRequest;

/// Request middleware
pub trait Middleware: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Inspect or transform the request before it reaches the handler
    fn apply(&self, req: &mut HostRequest) -> Result<(), HttpError>;
}

/// Produces body-parsing middleware for a prefix
pub trait BodyParserFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Middleware>;
}

/// JSON body parser
///
/// Takes and parses bodies declared as JSON (or undeclared). Requests with
/// another media type keep their raw body for the route handler. A request
/// whose body was already taken by a parser at an enclosing prefix is left
/// alone, so nested prefixes parse once.
#[derive(Debug, Clone)]
pub struct JsonBodyParser {
    limit: usize,
}

impl JsonBodyParser {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Middleware for JsonBodyParser {
    fn name(&self) -> &str {
        "json-body-parser"
    }

    fn apply(&self, req: &mut HostRequest) -> Result<(), HttpError> {
        let len = match &req.body {
            Some(body) if !body.is_empty() => body.len(),
            _ => return Ok(()),
        };

        if let Some(content_type) = req.content_type() {
            if !is_json_media_type(content_type) {
                return Ok(());
            }
        }

        if len > self.limit {
            return Err(HttpError::PayloadTooLarge { limit: self.limit });
        }

        let body = match req.body.take() {
            Some(body) => body,
            None => return Ok(()),
        };
        let value = serde_json::from_slice(&body)
            .map_err(|e| HttpError::InvalidJson(e.to_string()))?;
        debug!(
            "Parsed {} byte JSON body (request_id: {})",
            body.len(),
            req.request_id
        );
        req.json = Some(value);
        Ok(())
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
}

/// Factory for [`JsonBodyParser`] with a fixed limit
#[derive(Debug, Clone)]
pub struct JsonBodyParserFactory {
    limit: usize,
}

impl JsonBodyParserFactory {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl BodyParserFactory for JsonBodyParserFactory {
    fn create(&self) -> Arc<dyn Middleware> {
        Arc::new(JsonBodyParser::new(self.limit))
    }
}
