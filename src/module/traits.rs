//! Module system traits and interfaces
//!
//! Defines the contract every feature module satisfies to participate in the
//! host: a static descriptor, a router that mounts namespaced endpoints, and
//! optional lifecycle hooks.

use async_trait::async_trait;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::http::HttpServer;
use crate::module::context::ModuleRuntimeContext;

bitflags! {
    /// What a module contributes to the host
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Module mounts HTTP routes under its base path
        const BACKEND_ROUTES = 0b0000_0001;
        /// Module ships a UI surface
        const FRONTEND_SURFACE = 0b0000_0010;
        /// Module runs a one-time installer from its `Loaded` hook
        const INSTALLER = 0b0000_0100;
    }
}

impl Capabilities {
    /// Capability names, for operator-facing output
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Capabilities::BACKEND_ROUTES) {
            names.push("backend_routes");
        }
        if self.contains(Capabilities::FRONTEND_SURFACE) {
            names.push("frontend_surface");
        }
        if self.contains(Capabilities::INSTALLER) {
            names.push("installer");
        }
        names
    }
}

/// Static metadata for one module
///
/// Created when the module is authored and never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Unique, stable module identifier
    pub name: String,
    /// HTTP namespace prefix, conventionally `/api/<name>`
    pub base_path: String,
    /// Contribution set
    pub capabilities: Capabilities,
}

impl ModuleDescriptor {
    /// Create a descriptor with an explicit base path
    pub fn new(
        name: impl Into<String>,
        base_path: impl Into<String>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            capabilities,
        }
    }

    /// Create a descriptor mounted at the conventional `/api/<name>` prefix
    pub fn namespaced(name: impl Into<String>, capabilities: Capabilities) -> Self {
        let name = name.into();
        let base_path = format!("/api/{}", name);
        Self::new(name, base_path, capabilities)
    }

    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Join a sub-path onto the module's base path
    pub fn route(&self, sub_path: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        let sub = sub_path.trim_start_matches('/');
        if sub.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, sub)
        }
    }
}

/// Module lifecycle state, as tracked by the loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum ModuleState {
    /// Known to the catalog, not loaded yet
    Registered,
    /// Router is being invoked
    Mounting,
    /// Routes mounted and `Loaded` dispatched successfully
    Loaded,
    /// `Disabled` dispatched; routes stay mounted for the process lifetime
    Disabled,
    /// Mounting or the `Loaded` hook failed
    Error(String),
}

/// Lifecycle event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Loaded,
    Disabled,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Loaded => write!(f, "onModuleLoaded"),
            LifecycleKind::Disabled => write!(f, "onModuleDisabled"),
        }
    }
}

/// A lifecycle event, constructed and consumed within a single dispatch
#[derive(Clone, Copy)]
pub struct LifecycleEvent<'a> {
    pub kind: LifecycleKind,
    pub descriptor: &'a ModuleDescriptor,
    pub context: &'a ModuleRuntimeContext,
}

impl<'a> LifecycleEvent<'a> {
    pub fn new(
        kind: LifecycleKind,
        descriptor: &'a ModuleDescriptor,
        context: &'a ModuleRuntimeContext,
    ) -> Self {
        Self {
            kind,
            descriptor,
            context,
        }
    }
}

impl fmt::Debug for LifecycleEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("kind", &self.kind)
            .field("module", &self.descriptor.name)
            .finish()
    }
}

/// Lifecycle callbacks a module may implement
///
/// Both methods default to no-ops, so a module implements zero, one or both.
/// Errors are contained by the dispatcher and never reach the loader's caller.
#[async_trait]
pub trait ModuleHooks: Send + Sync {
    /// Called after the module's routes are mounted, and again on reload
    async fn on_module_loaded(&self, _event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called when the module is disabled or the host shuts down
    async fn on_module_disabled(&self, _event: &LifecycleEvent<'_>) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Module trait that all modules must implement
///
/// Instances are produced by the factory registered in the
/// [`ModuleCatalog`](crate::module::registry::ModuleCatalog).
#[async_trait]
pub trait Module: Send + Sync {
    /// Mount the module's namespaced endpoints on the shared server
    ///
    /// Body parsing must be requested through
    /// [`ModuleRuntimeContext::ensure_json_body`] so that a prefix never
    /// receives its parser twice.
    async fn register(
        &self,
        server: &mut HttpServer,
        context: &ModuleRuntimeContext,
    ) -> Result<(), ModuleError>;

    /// Lifecycle hooks, if the module has any
    fn hooks(&self) -> Option<&dyn ModuleHooks> {
        None
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Route registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Lifecycle hook failed: {0}")]
    HookFailed(String),

    #[error("Installer failed: {0}")]
    InstallFailed(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module already registered: {0}")]
    DuplicateModule(String),

    #[error("Invalid module descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Module panicked: {0}")]
    Panicked(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::Serialization(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
