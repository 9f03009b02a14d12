//! Host assembly
//!
//! Wires configuration, the module catalog and the surface manifest into a
//! running HTTP host: load every module, mount the UI routes, serve until a
//! shutdown signal, then dispatch `Disabled` to the loaded modules.

use hyper::StatusCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::http::{handler, html_response, HttpServer};
use crate::module::{Capabilities, LoadReport, ModuleCatalog, ModuleLoader, ModuleRuntimeContext};
use crate::surface::{SurfaceManifest, SurfaceResolver};
use crate::utils::create_shutdown_receiver;

/// A host with every module mounted, ready to serve
pub struct Host {
    server: HttpServer,
    loader: ModuleLoader,
    report: LoadReport,
}

impl Host {
    /// Load the catalog onto a fresh server and mount `/ui/<name>` for every
    /// mounted module with a frontend surface
    ///
    /// Modules skipped by `enabled_modules` or whose router failed get no UI
    /// route, matching their missing API routes.
    pub async fn build(
        config: &HostConfig,
        catalog: ModuleCatalog,
        surfaces: SurfaceManifest,
    ) -> Self {
        let context = ModuleRuntimeContext::from_config(config);
        Self::with_context(config, catalog, surfaces, context).await
    }

    /// As [`build`](Self::build), with a caller-supplied runtime context
    pub async fn with_context(
        config: &HostConfig,
        catalog: ModuleCatalog,
        surfaces: SurfaceManifest,
        context: ModuleRuntimeContext,
    ) -> Self {
        let mut server = HttpServer::new(config.http.max_request_bytes);
        let frontends: Vec<String> = catalog
            .descriptors()
            .filter(|d| d.has(Capabilities::FRONTEND_SURFACE))
            .map(|d| d.name.clone())
            .collect();

        let mut loader = ModuleLoader::new(catalog, context)
            .with_enabled_modules(config.modules.enabled_modules.clone());
        let report = loader.load_all(&mut server).await;

        let mounted = loader.mounted_modules();
        let resolver = SurfaceResolver::new(surfaces);
        for name in frontends.iter().filter(|name| mounted.contains(*name)) {
            mount_surface(&mut server, &resolver, name);
        }

        Self {
            server,
            loader,
            report,
        }
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn server(&self) -> &HttpServer {
        &self.server
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Serve until `shutdown` flips, then shut the modules down once every
    /// open connection has drained
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let Host {
            server, mut loader, ..
        } = self;

        let result = Arc::new(server).serve(listener, shutdown).await;

        for failure in loader.shutdown().await {
            warn!(
                "Module {} failed to shut down cleanly: {}",
                failure.module, failure.error
            );
        }
        result
    }
}

fn mount_surface(server: &mut HttpServer, resolver: &SurfaceResolver, module: &str) {
    let resolver = resolver.clone();
    let name = module.to_string();
    server.get(
        &format!("/ui/{}", module),
        handler(move |_req| {
            // One lazy surface per page render
            let html = resolver.surface_for(&name).render();
            async move { Ok(html_response(StatusCode::OK, html)) }
        }),
    );
}

/// Run the host until SIGINT/SIGTERM
pub async fn run(
    config: HostConfig,
    catalog: ModuleCatalog,
    surfaces: SurfaceManifest,
) -> anyhow::Result<()> {
    config.validate()?;

    let host = Host::build(&config, catalog, surfaces).await;
    if !host.report().is_clean() {
        warn!(
            "{} module(s) failed to load; serving the rest",
            host.report().failures.len()
        );
    }

    let listener = TcpListener::bind(config.http.listen_addr).await?;
    info!("modhost ready on {}", listener.local_addr()?);

    host.serve(listener, create_shutdown_receiver()).await
}
