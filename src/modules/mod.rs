//! Built-in modules
//!
//! The catalog and surface manifest the `modhost` binary ships with. Embedders
//! can extend either before handing them to [`crate::host::run`].

pub mod echo;
pub mod host;

use crate::module::{ModuleCatalog, ModuleError};
use crate::surface::SurfaceManifest;

/// Catalog of built-in modules, in load order
pub fn builtin_catalog() -> Result<ModuleCatalog, ModuleError> {
    ModuleCatalog::new()
        .with(host::descriptor(), |d| Box::new(host::HostModule::new(d)))?
        .with(echo::descriptor(), |d| Box::new(echo::EchoModule::new(d)))
}

/// UI entry points present in this build
pub fn builtin_surfaces() -> SurfaceManifest {
    SurfaceManifest::new().with("modules/echo/ui/Main", echo::load_surface)
}
