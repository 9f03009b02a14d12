//! Module runtime context
//!
//! The shared, read-mostly object every module's router and hooks receive.
//! Owned by the loader for the process lifetime; modules only borrow it.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Span;

use crate::config::HostConfig;
use crate::http::{BodyParserFactory, HttpServer, JsonBodyParserFactory};
use crate::module::installer::{InstallOutcome, InstallerTracker};
use crate::module::mount::RouteMountGuard;
use crate::module::status::StatusBoard;
use crate::module::traits::ModuleError;

/// Default JSON body limit for module prefixes (100KB)
pub const DEFAULT_JSON_BODY_LIMIT: usize = 100 * 1024;

/// Context handed to module routers and hooks
#[derive(Clone)]
pub struct ModuleRuntimeContext {
    body_parser: Arc<dyn BodyParserFactory>,
    mounts: RouteMountGuard,
    installers: InstallerTracker,
    status: StatusBoard,
    data_root: PathBuf,
    assets_root: PathBuf,
    module_configs: Arc<HashMap<String, HashMap<String, String>>>,
}

impl ModuleRuntimeContext {
    /// Create a context with fresh registries
    pub fn new<P: AsRef<Path>>(data_root: P, assets_root: P) -> Self {
        Self {
            body_parser: Arc::new(JsonBodyParserFactory::new(DEFAULT_JSON_BODY_LIMIT)),
            mounts: RouteMountGuard::default(),
            installers: InstallerTracker::default(),
            status: StatusBoard::new(),
            data_root: data_root.as_ref().to_path_buf(),
            assets_root: assets_root.as_ref().to_path_buf(),
            module_configs: Arc::new(HashMap::new()),
        }
    }

    /// Create a context from host configuration
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(&config.modules.data_dir, &config.modules.assets_dir)
            .with_body_parser(Arc::new(JsonBodyParserFactory::new(
                config.http.json_body_limit,
            )))
            .with_module_configs(config.modules.module_configs.clone())
    }

    pub fn with_body_parser(mut self, factory: Arc<dyn BodyParserFactory>) -> Self {
        self.body_parser = factory;
        self
    }

    pub fn with_module_configs(
        mut self,
        configs: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        self.module_configs = Arc::new(configs);
        self
    }

    /// Use an existing installer tracker (and its ledger)
    pub fn with_installers(mut self, installers: InstallerTracker) -> Self {
        self.installers = installers;
        self
    }

    /// Install the JSON body parser at `prefix` unless one is already there
    pub fn ensure_json_body(&self, server: &mut HttpServer, prefix: &str) -> bool {
        self.mounts
            .ensure_body_parser(server, prefix, self.body_parser.as_ref())
    }

    /// Run a module installer at most once per process
    pub async fn run_once<F, Fut>(&self, key: &str, installer: F) -> Result<InstallOutcome, ModuleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ModuleError>>,
    {
        self.installers.run_once(key, installer).await
    }

    pub fn body_parser(&self) -> &Arc<dyn BodyParserFactory> {
        &self.body_parser
    }

    pub fn mounts(&self) -> &RouteMountGuard {
        &self.mounts
    }

    pub fn installers(&self) -> &InstallerTracker {
        &self.installers
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Logging span for a module's own log lines
    pub fn module_span(&self, module: &str) -> Span {
        tracing::info_span!("module", module = %module)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Per-module data directory (not created here)
    pub fn module_data_dir(&self, module: &str) -> PathBuf {
        self.data_root.join(module)
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    pub fn module_config(&self, module: &str) -> Option<&HashMap<String, String>> {
        self.module_configs.get(module)
    }

    /// Get a module configuration value with default
    pub fn module_config_or(&self, module: &str, key: &str, default: &str) -> String {
        self.module_config(module)
            .and_then(|c| c.get(key))
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

impl std::fmt::Debug for ModuleRuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRuntimeContext")
            .field("data_root", &self.data_root)
            .field("assets_root", &self.assets_root)
            .field("mounted_prefixes", &self.mounts.registry().prefixes())
            .field("installed", &self.installers.ledger().keys())
            .finish()
    }
}
