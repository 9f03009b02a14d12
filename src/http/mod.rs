//! HTTP host
//!
//! A small hyper-based server that feature modules mount their namespaced
//! routes and body-parsing middleware on.

pub mod errors;
pub mod middleware;
pub mod server;
pub mod types;

pub use errors::HttpError;
pub use middleware::{BodyParserFactory, JsonBodyParser, JsonBodyParserFactory, Middleware};
pub use server::{HttpServer, DEFAULT_MAX_REQUEST_BYTES};
pub use types::{
    handler, html_response, json_response, ping_handler, HandlerFuture, HostRequest,
    HostResponse, RouteHandler,
};
