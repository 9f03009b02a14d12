//! modhost - pluggable module runtime over a shared HTTP server
//!
//! Independently authored feature modules are wired into one host through an
//! explicit catalog. Each module contributes namespaced routes, lifecycle
//! hooks and one-time installers; the host contains every module failure so
//! that one broken module never takes the others down.
//!
//! ## Components
//!
//! - [`module`]: descriptors, catalog, loader, hook dispatch, mount guard and
//!   installer tracking
//! - [`http`]: the hyper-based server modules mount on
//! - [`surface`]: lazy resolution of module UIs with placeholder fallback
//! - [`modules`]: built-in modules shipped with the `modhost` binary
//! - [`config`], [`utils`]: configuration, logging and signals

pub mod config;
pub mod host;
pub mod http;
pub mod module;
pub mod modules;
pub mod surface;
pub mod utils;

pub use config::HostConfig;
pub use host::Host;
pub use module::{
    Capabilities, LoadReport, Module, ModuleCatalog, ModuleDescriptor, ModuleError, ModuleHooks,
    ModuleLoader, ModuleRuntimeContext,
};
