//! Module registry
//!
//! Modules are wired in explicitly at build time rather than discovered by
//! scanning the filesystem.

pub mod catalog;

pub use catalog::{CatalogEntry, ModuleCatalog, ModuleFactory};
