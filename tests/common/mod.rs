//! Test utilities for module runtime tests
//!
//! Provides a configurable test module, an isolated host fixture and helpers
//! for driving requests through the server.

#![allow(dead_code)]

use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use modhost::config::HostConfig;
use modhost::http::{handler, json_response, HostRequest, HttpServer};
use modhost::module::{
    Capabilities, LifecycleEvent, Module, ModuleCatalog, ModuleDescriptor, ModuleError,
    ModuleHooks, ModuleLoader, ModuleRuntimeContext,
};

/// How a router or hook behaves when invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Shared observation point for test modules
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub loaded: Arc<AtomicUsize>,
    pub disabled: Arc<AtomicUsize>,
    pub installs: Arc<AtomicUsize>,
    /// `name:event` entries, in the order they happened
    pub events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn disabled(&self) -> usize {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, name: &str, event: &str) {
        self.events.lock().unwrap().push(format!("{}:{}", name, event));
    }
}

/// Configurable module for exercising the loader
///
/// Mounts `GET <base>/<name>/ping` and `POST <base>/<name>` (echoing the
/// parsed JSON body, or the raw text when nothing parsed it) before applying
/// its router behavior.
#[derive(Debug, Clone)]
pub struct TestModule {
    pub descriptor: ModuleDescriptor,
    pub router: Behavior,
    pub hook: Behavior,
    pub json_body: bool,
    pub has_hooks: bool,
    pub installer_key: Option<String>,
    pub installer_fails: bool,
    pub recorder: Recorder,
}

impl TestModule {
    pub fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            descriptor: ModuleDescriptor::namespaced(name, Capabilities::BACKEND_ROUTES),
            router: Behavior::Succeed,
            hook: Behavior::Succeed,
            json_body: true,
            has_hooks: true,
            installer_key: None,
            installer_fails: false,
            recorder: recorder.clone(),
        }
    }

    /// Mount under another module's prefix
    pub fn at(mut self, base_path: &str) -> Self {
        self.descriptor.base_path = base_path.to_string();
        self
    }

    pub fn router(mut self, behavior: Behavior) -> Self {
        self.router = behavior;
        self
    }

    pub fn hook(mut self, behavior: Behavior) -> Self {
        self.hook = behavior;
        self
    }

    /// Do not ask the mount guard for a JSON parser
    pub fn without_json_body(mut self) -> Self {
        self.json_body = false;
        self
    }

    pub fn without_hooks(mut self) -> Self {
        self.has_hooks = false;
        self
    }

    pub fn installer(mut self, key: &str) -> Self {
        self.installer_key = Some(key.to_string());
        self.descriptor.capabilities |= Capabilities::INSTALLER;
        self
    }

    pub fn failing_installer(mut self, key: &str) -> Self {
        self.installer_fails = true;
        self.installer(key)
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn ping_path(&self) -> String {
        self.descriptor.route(&format!("{}/ping", self.descriptor.name))
    }

    pub fn post_path(&self) -> String {
        self.descriptor.route(&self.descriptor.name)
    }
}

#[async_trait]
impl Module for TestModule {
    async fn register(
        &self,
        server: &mut HttpServer,
        context: &ModuleRuntimeContext,
    ) -> Result<(), ModuleError> {
        if self.json_body {
            context.ensure_json_body(server, &self.descriptor.base_path);
        }

        let name = self.descriptor.name.clone();
        server.get(&self.ping_path(), modhost::http::ping_handler(&name));
        server.post(
            &self.post_path(),
            handler(move |req| {
                let name = name.clone();
                async move {
                    let raw = req
                        .body
                        .as_ref()
                        .map(|b| String::from_utf8_lossy(b).into_owned());
                    Ok(json_response(
                        StatusCode::OK,
                        &json!({ "module": name, "body": req.json, "raw": raw }),
                    ))
                }
            }),
        );

        match self.router {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ModuleError::OperationError(format!(
                "{} router refused to mount",
                self.descriptor.name
            ))),
            Behavior::Panic => panic!("{} router exploded", self.descriptor.name),
        }
    }

    fn hooks(&self) -> Option<&dyn ModuleHooks> {
        if self.has_hooks {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl ModuleHooks for TestModule {
    async fn on_module_loaded(&self, event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        self.recorder.loaded.fetch_add(1, Ordering::SeqCst);
        self.recorder.record(&self.descriptor.name, "loaded");

        if let Some(key) = &self.installer_key {
            let installs = Arc::clone(&self.recorder.installs);
            let fails = self.installer_fails;
            event
                .context
                .run_once(key, move || async move {
                    installs.fetch_add(1, Ordering::SeqCst);
                    if fails {
                        Err(ModuleError::OperationError("disk full".to_string()))
                    } else {
                        Ok(())
                    }
                })
                .await?;
        }

        match self.hook {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ModuleError::OperationError("hook refused".to_string())),
            Behavior::Panic => panic!("{} hook exploded", self.descriptor.name),
        }
    }

    async fn on_module_disabled(&self, _event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        self.recorder.disabled.fetch_add(1, Ordering::SeqCst);
        self.recorder.record(&self.descriptor.name, "disabled");
        Ok(())
    }
}

/// Catalog of test modules, in the given order
pub fn catalog(modules: &[TestModule]) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    for module in modules {
        let module = module.clone();
        catalog
            .register(module.descriptor.clone(), move |_| Box::new(module.clone()))
            .unwrap();
    }
    catalog
}

/// Isolated host state: temp data root, fresh context and server
pub struct HostFixture {
    pub temp_dir: TempDir,
    pub context: ModuleRuntimeContext,
    pub server: HttpServer,
}

impl HostFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let context = ModuleRuntimeContext::new(
            temp_dir.path().join("data"),
            temp_dir.path().join("modules"),
        );
        Self {
            temp_dir,
            context,
            server: HttpServer::default(),
        }
    }

    pub fn loader(&self, catalog: ModuleCatalog) -> ModuleLoader {
        ModuleLoader::new(catalog, self.context.clone())
    }

    /// Host configuration rooted in this fixture's temp dir
    pub fn config(&self) -> HostConfig {
        let mut config = HostConfig::default();
        config.modules.data_dir = self.temp_dir.path().join("data");
        config.modules.assets_dir = self.temp_dir.path().join("modules");
        config
    }
}

/// Route a GET through the server and decode the body as JSON
pub async fn get_json(server: &HttpServer, path: &str) -> (StatusCode, Value) {
    let response = server.handle(HostRequest::new(Method::GET, path)).await;
    decode(response).await
}

/// Route a JSON POST through the server and decode the body as JSON
pub async fn post_json(server: &HttpServer, path: &str, body: &Value) -> (StatusCode, Value) {
    let response = server
        .handle(HostRequest::new(Method::POST, path).with_json(body))
        .await;
    decode(response).await
}

/// Route a `text/plain` POST through the server and decode the body as JSON
pub async fn post_text(
    server: &HttpServer,
    path: &str,
    body: &'static str,
) -> (StatusCode, Value) {
    let response = server
        .handle(HostRequest::new(Method::POST, path).with_body("text/plain", body))
        .await;
    decode(response).await
}

/// Route a GET and return the raw body text
pub async fn get_text(server: &HttpServer, path: &str) -> (StatusCode, String) {
    let response = server.handle(HostRequest::new(Method::GET, path)).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn decode(response: modhost::http::HostResponse) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}
