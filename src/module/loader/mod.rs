//! Module loading
//!
//! Drives catalog modules through mount and lifecycle dispatch.

pub mod loader;

pub use loader::{LoadFailure, LoadReport, LoadStage, ModuleLoader};
