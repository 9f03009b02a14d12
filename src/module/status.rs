//! Module status board
//!
//! Read-mostly snapshot of module states and the last load report, written by
//! the loader and read by operator-facing endpoints.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::module::loader::LoadReport;
use crate::module::traits::{ModuleDescriptor, ModuleState};

/// Status of one module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub base_path: String,
    pub capabilities: Vec<&'static str>,
    #[serde(flatten)]
    pub state: ModuleState,
    /// Routes the module mounted, as `METHOD path`
    pub routes: Vec<String>,
}

/// Snapshot served to operators
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub modules: Vec<ModuleStatus>,
    pub report: Option<LoadReport>,
}

#[derive(Debug, Default)]
struct BoardInner {
    // Keyed by name; `order` keeps enumeration order for output
    modules: BTreeMap<String, ModuleStatus>,
    order: Vec<String>,
    report: Option<LoadReport>,
}

/// Shared handle to the status board
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BoardInner>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a module in the `Registered` state (no-op if already present)
    pub fn register(&self, descriptor: &ModuleDescriptor) {
        let mut inner = self.write();
        if inner.modules.contains_key(&descriptor.name) {
            return;
        }
        inner.order.push(descriptor.name.clone());
        inner.modules.insert(
            descriptor.name.clone(),
            ModuleStatus {
                name: descriptor.name.clone(),
                base_path: descriptor.base_path.clone(),
                capabilities: descriptor.capabilities.names(),
                state: ModuleState::Registered,
                routes: Vec::new(),
            },
        );
    }

    pub fn set_state(&self, name: &str, state: ModuleState) {
        if let Some(status) = self.write().modules.get_mut(name) {
            status.state = state;
        }
    }

    pub fn set_routes(&self, name: &str, routes: Vec<String>) {
        if let Some(status) = self.write().modules.get_mut(name) {
            status.routes = routes;
        }
    }

    pub fn set_report(&self, report: LoadReport) {
        self.write().report = Some(report);
    }

    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.read().modules.get(name).map(|s| s.state.clone())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.read();
        StatusSnapshot {
            modules: inner
                .order
                .iter()
                .filter_map(|name| inner.modules.get(name).cloned())
                .collect(),
            report: inner.report.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::traits::Capabilities;

    #[test]
    fn test_snapshot_keeps_registration_order() {
        let board = StatusBoard::new();
        board.register(&ModuleDescriptor::namespaced("zeta", Capabilities::BACKEND_ROUTES));
        board.register(&ModuleDescriptor::namespaced("alpha", Capabilities::BACKEND_ROUTES));
        board.register(&ModuleDescriptor::namespaced("zeta", Capabilities::empty()));
        board.set_state("alpha", ModuleState::Loaded);

        let snapshot = board.snapshot();
        let names: Vec<_> = snapshot.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(board.state("alpha"), Some(ModuleState::Loaded));
        assert_eq!(board.state("zeta"), Some(ModuleState::Registered));
        assert_eq!(board.state("missing"), None);
    }

    #[test]
    fn test_status_serializes_flat_state() {
        let board = StatusBoard::new();
        board.register(&ModuleDescriptor::namespaced("a", Capabilities::BACKEND_ROUTES));
        board.set_state("a", ModuleState::Error("router failed".into()));
        let json = serde_json::to_value(board.snapshot()).unwrap();
        assert_eq!(json["modules"][0]["state"], "error");
        assert_eq!(json["modules"][0]["reason"], "router failed");
        assert_eq!(json["modules"][0]["capabilities"][0], "backend_routes");
    }
}
