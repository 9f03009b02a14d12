//! Module plugin runtime
//!
//! Feature modules are independently authored units that contribute HTTP
//! routes, lifecycle hooks and one-time installers to a shared host.
//!
//! ## Architecture
//!
//! - **Explicit catalog**: modules are registered at build time with a
//!   descriptor and a factory; nothing is discovered by scanning.
//! - **Namespacing**: each module mounts under its own `/api/<name>` prefix;
//!   body-parsing middleware is installed at most once per prefix.
//! - **Failure containment**: a module whose router or hook fails is recorded
//!   in the load report and the rest of the host keeps loading and serving.
//! - **At-most-once installers**: one-time setup runs once per process,
//!   tracked by an in-memory ledger.

pub mod context;
pub mod hooks;
pub mod installer;
pub mod loader;
pub mod mount;
pub mod registry;
pub mod status;
pub mod traits;
pub mod validation;

pub use context::ModuleRuntimeContext;
pub use hooks::{DispatchOutcome, HookDispatcher};
pub use installer::{InstallOutcome, InstallationLedger, InstallerTracker};
pub use loader::{LoadFailure, LoadReport, LoadStage, ModuleLoader};
pub use mount::{MountRegistry, RouteMountGuard};
pub use registry::{CatalogEntry, ModuleCatalog, ModuleFactory};
pub use status::{ModuleStatus, StatusBoard, StatusSnapshot};
pub use traits::{
    Capabilities, LifecycleEvent, LifecycleKind, Module, ModuleDescriptor, ModuleError,
    ModuleHooks, ModuleState,
};
