//! Module loader implementation
//!
//! Drives each catalog module through its lifecycle: mount its routes, then
//! dispatch `Loaded`. Modules are processed strictly one after another, and a
//! failing module is recorded in the [`LoadReport`] without stopping the rest.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

use crate::http::HttpServer;
use crate::module::context::ModuleRuntimeContext;
use crate::module::hooks::{DispatchOutcome, HookDispatcher};
use crate::module::registry::ModuleCatalog;
use crate::module::traits::{
    panic_message, LifecycleEvent, LifecycleKind, Module, ModuleDescriptor, ModuleError,
    ModuleState,
};
use crate::module::validation::{DescriptorValidator, ValidationResult};

/// Where in the load sequence a module failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    Mount,
    Hook,
}

/// One isolated module failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub module: String,
    pub stage: LoadStage,
    pub error: String,
}

/// Outcome of [`ModuleLoader::load_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Modules whose routes are mounted and whose `Loaded` hook succeeded
    pub loaded: Vec<String>,
    /// Modules not loaded because they are disabled in config or already loaded
    pub skipped: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, module: &str) -> Option<&LoadFailure> {
        self.failures.iter().find(|f| f.module == module)
    }

    fn record(&mut self, module: &str, stage: LoadStage, error: &ModuleError) {
        self.failures.push(LoadFailure {
            module: module.to_string(),
            stage,
            error: error.to_string(),
        });
    }

    /// Log the report for operators
    pub fn log_summary(&self) {
        info!(
            "Module load complete: {} loaded, {} skipped, {} failed",
            self.loaded.len(),
            self.skipped.len(),
            self.failures.len()
        );
        for failure in &self.failures {
            warn!(
                "Module {} failed at {:?} stage: {}",
                failure.module, failure.stage, failure.error
            );
        }
    }
}

/// A module whose router has been invoked successfully
struct LoadedModule {
    descriptor: ModuleDescriptor,
    instance: Box<dyn Module>,
    state: ModuleState,
}

/// Module loader; owns the runtime context and with it the mount registry
/// and installation ledger
pub struct ModuleLoader {
    catalog: ModuleCatalog,
    context: ModuleRuntimeContext,
    dispatcher: HookDispatcher,
    validator: DescriptorValidator,
    /// Empty = every catalog module is enabled
    enabled_modules: Vec<String>,
    modules: Vec<LoadedModule>,
}

impl ModuleLoader {
    pub fn new(catalog: ModuleCatalog, context: ModuleRuntimeContext) -> Self {
        for descriptor in catalog.descriptors() {
            context.status().register(descriptor);
        }
        Self {
            catalog,
            context,
            dispatcher: HookDispatcher::new(),
            validator: DescriptorValidator::new(),
            enabled_modules: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Restrict loading to the named modules (empty = all)
    pub fn with_enabled_modules(mut self, enabled: Vec<String>) -> Self {
        self.enabled_modules = enabled;
        self
    }

    pub fn context(&self) -> &ModuleRuntimeContext {
        &self.context
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.context.status().state(name)
    }

    /// Names of modules whose routes are mounted, in load order
    pub fn mounted_modules(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|m| m.descriptor.name.clone())
            .collect()
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled_modules.is_empty() || self.enabled_modules.iter().any(|n| n == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.descriptor.name == name)
    }

    fn set_state(&mut self, index: usize, state: ModuleState) {
        let module = &mut self.modules[index];
        self.context
            .status()
            .set_state(&module.descriptor.name, state.clone());
        module.state = state;
    }

    /// Load every enabled catalog module, in catalog order
    ///
    /// Never fails as a whole: mount and hook failures are contained per
    /// module and returned in the report.
    pub async fn load_all(&mut self, server: &mut HttpServer) -> LoadReport {
        info!("Loading {} modules", self.catalog.len());
        let mut report = LoadReport::default();
        let entries = self.catalog.entries().to_vec();

        for entry in entries {
            let descriptor = entry.descriptor.clone();
            let name = descriptor.name.clone();

            if !self.is_enabled(&name) {
                debug!("Module {} not enabled, skipping", name);
                report.skipped.push(name);
                continue;
            }
            if self.position(&name).is_some() {
                debug!("Module {} already loaded, skipping", name);
                report.skipped.push(name);
                continue;
            }

            if let ValidationResult::Invalid(errors) = self.validator.validate(&descriptor) {
                // Conventions are advisory; collisions are the author's concern
                debug!("Loading module {} despite: {:?}", name, errors);
            }

            let status = self.context.status().clone();
            status.set_state(&name, ModuleState::Mounting);

            let instance = match std::panic::catch_unwind(AssertUnwindSafe(|| entry.instantiate())) {
                Ok(instance) => instance,
                Err(payload) => {
                    let error = ModuleError::Panicked(format!(
                        "{} factory: {}",
                        name,
                        panic_message(payload.as_ref())
                    ));
                    warn!("Failed to instantiate module {}: {}", name, error);
                    report.record(&name, LoadStage::Mount, &error);
                    status.set_state(&name, ModuleState::Error(error.to_string()));
                    continue;
                }
            };

            if let Err(error) = self.mount(server, instance.as_ref(), &descriptor).await {
                warn!("Failed to mount module {}: {}", name, error);
                report.record(&name, LoadStage::Mount, &error);
                status.set_state(&name, ModuleState::Error(error.to_string()));
                continue;
            }
            status.set_routes(&name, server.routes_of(&name));

            self.modules.push(LoadedModule {
                descriptor,
                instance,
                state: ModuleState::Mounting,
            });
            let index = self.modules.len() - 1;

            match self.dispatch(index, LifecycleKind::Loaded).await {
                DispatchOutcome::Failed(error) => {
                    report.record(&name, LoadStage::Hook, &error);
                    self.set_state(index, ModuleState::Error(error.to_string()));
                }
                DispatchOutcome::Completed | DispatchOutcome::Skipped => {
                    self.set_state(index, ModuleState::Loaded);
                    info!("Module {} loaded", name);
                    report.loaded.push(name);
                }
            }
        }

        report.log_summary();
        self.context.status().set_report(report.clone());
        report
    }

    /// Invoke the module's router; on failure its routes are retracted
    async fn mount(
        &self,
        server: &mut HttpServer,
        instance: &dyn Module,
        descriptor: &ModuleDescriptor,
    ) -> Result<(), ModuleError> {
        let name = &descriptor.name;
        debug!("Mounting module {} at {}", name, descriptor.base_path);

        server.begin_mount(name);
        let result = AssertUnwindSafe(instance.register(server, &self.context))
            .catch_unwind()
            .await;
        server.end_mount();

        let error = match result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => ModuleError::RegistrationFailed(format!("{}: {}", name, e)),
            Err(payload) => ModuleError::Panicked(format!(
                "{} router: {}",
                name,
                panic_message(payload.as_ref())
            )),
        };

        let discarded = server.discard_routes(name);
        if discarded > 0 {
            debug!("Discarded {} routes from failed module {}", discarded, name);
        }
        Err(error)
    }

    async fn dispatch(&self, index: usize, kind: LifecycleKind) -> DispatchOutcome {
        let module = &self.modules[index];
        let event = LifecycleEvent::new(kind, &module.descriptor, &self.context);
        self.dispatcher
            .dispatch(module.instance.as_ref(), event)
            .await
    }

    /// Dispatch `Disabled` to a mounted module
    ///
    /// Routes are not retracted; they stay bound for the process lifetime.
    pub async fn unload(&mut self, name: &str) -> Result<DispatchOutcome, ModuleError> {
        info!("Unloading module: {}", name);
        let index = self
            .position(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;

        if self.modules[index].state == ModuleState::Disabled {
            debug!("Module {} already disabled", name);
            return Ok(DispatchOutcome::Skipped);
        }

        let outcome = self.dispatch(index, LifecycleKind::Disabled).await;
        self.set_state(index, ModuleState::Disabled);
        Ok(outcome)
    }

    /// Dispatch `Loaded` again to a mounted module, without remounting
    ///
    /// Installer-guarded side effects are not repeated; the hook itself runs.
    pub async fn reload(&mut self, name: &str) -> Result<DispatchOutcome, ModuleError> {
        info!("Reloading module: {}", name);
        let index = self
            .position(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;

        let outcome = self.dispatch(index, LifecycleKind::Loaded).await;
        let state = match &outcome {
            DispatchOutcome::Failed(error) => ModuleState::Error(error.to_string()),
            DispatchOutcome::Completed | DispatchOutcome::Skipped => ModuleState::Loaded,
        };
        self.set_state(index, state);
        Ok(outcome)
    }

    /// Dispatch `Disabled` to every mounted module, newest first
    pub async fn shutdown(&mut self) -> Vec<LoadFailure> {
        info!("Shutting down {} modules", self.modules.len());
        let mut failures = Vec::new();

        for index in (0..self.modules.len()).rev() {
            if self.modules[index].state == ModuleState::Disabled {
                continue;
            }
            let name = self.modules[index].descriptor.name.clone();
            if let DispatchOutcome::Failed(error) = self.dispatch(index, LifecycleKind::Disabled).await {
                failures.push(LoadFailure {
                    module: name,
                    stage: LoadStage::Hook,
                    error: error.to_string(),
                });
            }
            self.set_state(index, ModuleState::Disabled);
        }

        info!("Module shutdown complete");
        failures
    }
}
