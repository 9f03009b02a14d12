//! Host introspection module
//!
//! Mounted at `/api/host`: a liveness ping and a view of every module's state
//! plus the last load report.

use async_trait::async_trait;
use hyper::StatusCode;

use crate::http::{handler, json_response, ping_handler, HttpError, HttpServer};
use crate::module::{Capabilities, Module, ModuleDescriptor, ModuleError, ModuleRuntimeContext};

pub const NAME: &str = "host";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::namespaced(NAME, Capabilities::BACKEND_ROUTES)
}

pub struct HostModule {
    descriptor: ModuleDescriptor,
}

impl HostModule {
    pub fn new(descriptor: &ModuleDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
        }
    }
}

#[async_trait]
impl Module for HostModule {
    async fn register(
        &self,
        server: &mut HttpServer,
        context: &ModuleRuntimeContext,
    ) -> Result<(), ModuleError> {
        server.get(&self.descriptor.route("ping"), ping_handler(NAME));

        let status = context.status().clone();
        server.get(
            &self.descriptor.route("modules"),
            handler(move |_req| {
                let snapshot = status.snapshot();
                async move {
                    let body = serde_json::to_value(&snapshot)
                        .map_err(|e| HttpError::Internal(e.to_string()))?;
                    Ok(json_response(StatusCode::OK, &body))
                }
            }),
        );
        Ok(())
    }
}
