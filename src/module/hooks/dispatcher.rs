//! Hook dispatcher for calling module lifecycle hooks
//!
//! Failures (errors and panics) are contained here and returned as a
//! [`DispatchOutcome`]; they never propagate to the caller.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn, Instrument};

use crate::module::traits::{panic_message, LifecycleEvent, LifecycleKind, Module, ModuleError};

/// Result of dispatching one lifecycle event to one module
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Module has no hooks; nothing ran
    Skipped,
    /// Hook ran and settled successfully
    Completed,
    /// Hook returned an error or panicked
    Failed(ModuleError),
}

impl DispatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }
}

/// Dispatches lifecycle events, awaiting each hook to completion
#[derive(Debug, Clone, Copy, Default)]
pub struct HookDispatcher;

impl HookDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch `event` to `module`'s hooks
    ///
    /// No timeout is applied: a hook that never settles stalls the caller.
    pub async fn dispatch(&self, module: &dyn Module, event: LifecycleEvent<'_>) -> DispatchOutcome {
        let name = &event.descriptor.name;

        let hooks = match module.hooks() {
            Some(hooks) => hooks,
            None => {
                debug!("Module {} has no hooks, skipping {}", name, event.kind);
                return DispatchOutcome::Skipped;
            }
        };

        let span = event.context.module_span(name);
        let call = async {
            match event.kind {
                LifecycleKind::Loaded => hooks.on_module_loaded(&event).await,
                LifecycleKind::Disabled => hooks.on_module_disabled(&event).await,
            }
        };

        match AssertUnwindSafe(call.instrument(span)).catch_unwind().await {
            Ok(Ok(())) => {
                debug!("Module {} {} completed", name, event.kind);
                DispatchOutcome::Completed
            }
            Ok(Err(e)) => {
                warn!("Module {} {} failed: {}", name, event.kind, e);
                DispatchOutcome::Failed(ModuleError::HookFailed(format!(
                    "{} {}: {}",
                    name, event.kind, e
                )))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Module {} {} panicked: {}", name, event.kind, message);
                DispatchOutcome::Failed(ModuleError::Panicked(format!(
                    "{} {}: {}",
                    name, event.kind, message
                )))
            }
        }
    }
}
