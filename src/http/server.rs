//! Shared HTTP server
//!
//! Modules mount routes and prefix-scoped middleware here during startup
//! (through `&mut HttpServer`); afterwards the server is frozen behind an
//! `Arc` and served with hyper.

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::errors::HttpError;
use super::middleware::Middleware;
use super::types::{HostRequest, HostResponse, RouteHandler};

/// Default cap on collected request bodies (1MB)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1_048_576;

struct Route {
    method: Method,
    path: String,
    /// Module that mounted the route, if it was mounted by the loader
    owner: Option<String>,
    handler: RouteHandler,
}

struct MountedMiddleware {
    prefix: String,
    middleware: Arc<dyn Middleware>,
}

/// Route table plus prefix-scoped middleware
pub struct HttpServer {
    routes: Vec<Route>,
    middleware: Vec<MountedMiddleware>,
    owner: Option<String>,
    max_request_bytes: usize,
}

impl HttpServer {
    pub fn new(max_request_bytes: usize) -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            owner: None,
            max_request_bytes,
        }
    }

    /// Bind `handler` to `method` + `path`
    ///
    /// A later binding for the same method and path shadows nothing: the
    /// first registered route wins.
    pub fn route(&mut self, method: Method, path: &str, handler: RouteHandler) -> &mut Self {
        let path = normalize_path(path);
        debug!("Mounting route {} {}", method, path);
        self.routes.push(Route {
            method,
            path,
            owner: self.owner.clone(),
            handler,
        });
        self
    }

    pub fn get(&mut self, path: &str, handler: RouteHandler) -> &mut Self {
        self.route(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: RouteHandler) -> &mut Self {
        self.route(Method::POST, path, handler)
    }

    /// Install middleware at `prefix`, unconditionally
    ///
    /// Modules should go through the route mount guard instead; this is the
    /// raw operation it wraps.
    pub fn use_middleware(&mut self, prefix: &str, middleware: Arc<dyn Middleware>) {
        let prefix = normalize_path(prefix);
        debug!("Installing {} at {}", middleware.name(), prefix);
        self.middleware.push(MountedMiddleware { prefix, middleware });
    }

    /// Number of middleware installed exactly at `prefix`
    pub fn middleware_count(&self, prefix: &str) -> usize {
        let prefix = normalize_path(prefix);
        self.middleware.iter().filter(|m| m.prefix == prefix).count()
    }

    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        let path = normalize_path(path);
        self.routes
            .iter()
            .any(|r| r.method == *method && r.path == path)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Routes mounted by `owner`, as `METHOD path`
    pub fn routes_of(&self, owner: &str) -> Vec<String> {
        self.routes
            .iter()
            .filter(|r| r.owner.as_deref() == Some(owner))
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Tag routes mounted from now on with `owner`
    pub(crate) fn begin_mount(&mut self, owner: &str) {
        self.owner = Some(owner.to_string());
    }

    pub(crate) fn end_mount(&mut self) {
        self.owner = None;
    }

    /// Drop every route mounted by `owner`; middleware is kept
    pub(crate) fn discard_routes(&mut self, owner: &str) -> usize {
        let before = self.routes.len();
        self.routes.retain(|r| r.owner.as_deref() != Some(owner));
        before - self.routes.len()
    }

    /// Route a collected request
    pub async fn handle(&self, mut req: HostRequest) -> HostResponse {
        let path = normalize_path(&req.path);

        let route = self
            .routes
            .iter()
            .find(|r| r.path == path && r.method == req.method);

        let route = match route {
            Some(route) => route,
            None => {
                let err = if self.routes.iter().any(|r| r.path == path) {
                    HttpError::MethodNotAllowed {
                        method: req.method.to_string(),
                        path,
                    }
                } else {
                    HttpError::NotFound(path)
                };
                return err.to_response(&req.request_id);
            }
        };

        for mounted in self
            .middleware
            .iter()
            .filter(|m| prefix_matches(&m.prefix, &path))
        {
            if let Err(e) = mounted.middleware.apply(&mut req) {
                debug!(
                    "{} rejected {} {}: {}",
                    mounted.middleware.name(),
                    req.method,
                    path,
                    e
                );
                return e.to_response(&req.request_id);
            }
        }

        let request_id = req.request_id.clone();
        match (route.handler)(req).await {
            Ok(response) => response,
            Err(e) => e.to_response(&request_id),
        }
    }

    /// Collect a hyper request and route it
    pub async fn handle_incoming(&self, req: Request<Incoming>) -> HostResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (parts, body) = req.into_parts();

        debug!(
            "HTTP {} {} (request_id: {})",
            parts.method,
            parts.uri.path(),
            &request_id[..8]
        );

        let body: Bytes = match Limited::new(body, self.max_request_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                    HttpError::PayloadTooLarge {
                        limit: self.max_request_bytes,
                    }
                } else {
                    HttpError::BadRequest(format!("Failed to read request body: {}", e))
                };
                return err.to_response(&request_id);
            }
        };

        let req = HostRequest {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(|q| q.to_string()),
            headers: parts.headers,
            body: Some(body),
            json: None,
            request_id,
        };

        self.handle(req).await
    }

    /// Accept connections until `shutdown` flips to `true` (or its sender drops)
    ///
    /// Open connections are then told to finish their in-flight request and
    /// close; this returns once every one of them has ended.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!("HTTP server listening on {}", listener.local_addr()?);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("New HTTP connection from {}", addr);
                        let server = Arc::clone(&self);
                        let mut stop = shutdown.clone();
                        connections.spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let server = Arc::clone(&server);
                                async move { Ok::<_, Infallible>(server.handle_incoming(req).await) }
                            });
                            let conn = http1::Builder::new().serve_connection(io, service);
                            tokio::pin!(conn);

                            let result = tokio::select! {
                                result = conn.as_mut() => result,
                                _ = shutdown_requested(&mut stop) => {
                                    conn.as_mut().graceful_shutdown();
                                    conn.await
                                }
                            };
                            if let Err(e) = result {
                                debug!("HTTP connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept HTTP connection: {}", e);
                    }
                },
                Some(joined) = connections.join_next() => {
                    if let Err(e) = joined {
                        warn!("HTTP connection task failed: {}", e);
                    }
                }
                _ = shutdown_requested(&mut shutdown) => {
                    info!("HTTP server shutting down");
                    break;
                }
            }
        }

        drop(listener);
        if !connections.is_empty() {
            info!("Draining {} open HTTP connections", connections.len());
        }
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!("HTTP connection task failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Resolves once `shutdown` holds `true` or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUEST_BYTES)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
