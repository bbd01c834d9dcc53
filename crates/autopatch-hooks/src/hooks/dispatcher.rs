//! Hook dispatcher: runs every hook for a module with per-hook isolation.
//!
//! - Hooks run synchronously, in registration order, on the calling thread.
//! - A hook that returns an error or panics is logged at debug level and
//!   skipped; the remaining hooks still run.
//! - Nothing ever propagates to the caller.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use super::definitions::LoadEvent;
use super::registry::HookRegistry;
use crate::traits::{HookFailure, panic_message};

/// Summary of a dispatch, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Hooks that were called.
    pub invoked: usize,
    /// Hooks that failed (error or panic).
    pub failed: usize,
}

impl DispatchReport {
    /// Returns whether no hook was called.
    pub fn is_empty(&self) -> bool {
        self.invoked == 0
    }
}

/// Dispatches load events to registered hooks.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches a load event.
    ///
    /// Events for failed loads or unresolved names run nothing.
    pub fn dispatch(&self, event: &LoadEvent) -> DispatchReport {
        if !event.is_dispatchable() {
            debug!(
                module = %event.module,
                trigger = %event.trigger,
                outcome = ?event.outcome,
                at = %event.timestamp,
                "Skipping hook dispatch"
            );
            return DispatchReport::default();
        }

        match event.module.as_name() {
            Some(name) => {
                debug!(
                    module = %name,
                    trigger = %event.trigger,
                    at = %event.timestamp,
                    "Module available"
                );
                self.call(name)
            }
            None => DispatchReport::default(),
        }
    }

    /// Calls every hook registered for `module_name`.
    ///
    /// Unknown names are a no-op.
    pub fn call(&self, module_name: &str) -> DispatchReport {
        // Snapshot so hooks can register hooks or trigger nested loads.
        let handlers = self.registry.hooks_for(module_name);
        if handlers.is_empty() {
            return DispatchReport::default();
        }

        debug!(
            module = %module_name,
            hook_count = handlers.len(),
            "Calling import hooks"
        );

        let mut report = DispatchReport::default();
        for handler in &handlers {
            report.invoked += 1;

            let result = match panic::catch_unwind(AssertUnwindSafe(|| handler.call())) {
                Ok(result) => result,
                Err(payload) => Err(HookFailure::Panicked(panic_message(payload.as_ref()))),
            };

            if let Err(e) = result {
                report.failed += 1;
                debug!(
                    module = %module_name,
                    owner = %handler.owner(),
                    error = %e,
                    "Failed to call hook for module"
                );
            }
        }

        report
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}
