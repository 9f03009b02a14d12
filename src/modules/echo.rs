//! Echo module
//!
//! Exercises the whole module contract: JSON body parsing through the mount
//! guard, a namespaced POST route, lifecycle hooks and a one-time installer
//! that prepares the module's data directory.

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

use crate::http::{handler, json_response, ping_handler, HttpServer};
use crate::module::{
    Capabilities, InstallOutcome, LifecycleEvent, Module, ModuleDescriptor, ModuleError,
    ModuleHooks, ModuleRuntimeContext,
};
use crate::surface::{Surface, SurfaceExports};

pub const NAME: &str = "echo";

/// Installation ledger key for the data directory setup
pub const INSTALL_KEY: &str = "echo:data-dir";

/// Written once into the module's data directory by the installer
pub const MARKER_FILE: &str = "installed";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::namespaced(
        NAME,
        Capabilities::BACKEND_ROUTES | Capabilities::FRONTEND_SURFACE | Capabilities::INSTALLER,
    )
}

pub struct EchoModule {
    descriptor: ModuleDescriptor,
}

impl EchoModule {
    pub fn new(descriptor: &ModuleDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
        }
    }
}

#[async_trait]
impl Module for EchoModule {
    async fn register(
        &self,
        server: &mut HttpServer,
        context: &ModuleRuntimeContext,
    ) -> Result<(), ModuleError> {
        context.ensure_json_body(server, &self.descriptor.base_path);

        let greeting = context.module_config_or(NAME, "greeting", "echo");
        server.post(
            &self.descriptor.base_path,
            handler(move |req| {
                let greeting = greeting.clone();
                async move {
                    Ok(json_response(
                        StatusCode::OK,
                        &json!({
                            "greeting": greeting,
                            "echo": req.json,
                            "request_id": req.request_id,
                        }),
                    ))
                }
            }),
        );
        server.get(&self.descriptor.route("ping"), ping_handler(NAME));
        Ok(())
    }

    fn hooks(&self) -> Option<&dyn ModuleHooks> {
        Some(self)
    }
}

#[async_trait]
impl ModuleHooks for EchoModule {
    async fn on_module_loaded(&self, event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        let dir = event.context.module_data_dir(NAME);
        let outcome = event
            .context
            .run_once(INSTALL_KEY, move || async move {
                tokio::fs::create_dir_all(&dir).await?;
                let marker = dir.join(MARKER_FILE);
                // Survives restarts; the ledger does not
                if !tokio::fs::try_exists(&marker).await? {
                    tokio::fs::write(&marker, b"echo\n").await?;
                }
                Ok::<(), ModuleError>(())
            })
            .instrument(event.context.module_span(NAME))
            .await?;

        match outcome {
            InstallOutcome::Installed => info!("Echo module data directory ready"),
            InstallOutcome::AlreadyAttempted => debug!("Echo installer already ran"),
        }
        Ok(())
    }

    async fn on_module_disabled(&self, _event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        debug!("Echo module disabled");
        Ok(())
    }
}

/// Echo module UI
pub struct EchoSurface;

impl Surface for EchoSurface {
    fn render(&self) -> String {
        "<section data-module=\"echo\"><h1>Echo</h1><p>POST JSON to /api/echo.</p></section>"
            .to_string()
    }
}

pub(crate) fn load_surface() -> Result<SurfaceExports, crate::surface::SurfaceError> {
    Ok(SurfaceExports::main(Arc::new(EchoSurface)))
}
