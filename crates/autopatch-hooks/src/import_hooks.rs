//! The import hooks bundle: one registry, one runtime, one controller.

use std::sync::Arc;

use tracing::debug;

use autopatch_core::config::hooks::InterceptionMode;

use crate::hooks::definitions::{LoadEvent, LoadOutcome, LoadTrigger};
use crate::hooks::dispatcher::{DispatchReport, HookDispatcher};
use crate::hooks::registry::HookRegistry;
use crate::patch::{PatchController, PatchState};
use crate::resolver::{ModuleIdentity, NameResolver};
use crate::runtime::ModuleRuntime;
use crate::traits::HookHandler;

/// Registry, dispatcher, runtime, and patch controller wired together.
#[derive(Debug)]
pub struct ImportHooks {
    registry: Arc<HookRegistry>,
    dispatcher: Arc<HookDispatcher>,
    runtime: Arc<ModuleRuntime>,
    controller: PatchController,
}

impl ImportHooks {
    /// Creates hooks over a fresh current-generation runtime.
    pub fn new() -> Self {
        Self::with_runtime(Arc::new(ModuleRuntime::modern()), InterceptionMode::Auto)
    }

    /// Creates hooks over `runtime`.
    pub fn with_runtime(runtime: Arc<ModuleRuntime>, mode: InterceptionMode) -> Self {
        let registry = Arc::new(HookRegistry::new());
        let dispatcher = Arc::new(HookDispatcher::new(registry.clone()));
        let controller = PatchController::new(runtime.clone(), dispatcher.clone(), mode);

        Self {
            registry,
            dispatcher,
            runtime,
            controller,
        }
    }

    /// Registers `hook` to run whenever `module_name` is loaded or reloaded.
    ///
    /// Registering after the module already loaded does not run the hook
    /// until the next reload.
    pub fn register(&self, module_name: impl Into<String>, hook: Arc<dyn HookHandler>) {
        self.registry.register(module_name, hook);
    }

    /// Registers a closure hook.
    pub fn register_fn<F, E>(&self, module_name: impl Into<String>, owner: &str, callback: F)
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        self.registry.register_fn(module_name, owner, callback);
    }

    /// Installs the interception layer. Never fails.
    pub fn install(&self) {
        self.controller.install();
    }

    /// Removes the interception layer. Never fails.
    pub fn uninstall(&self) {
        self.controller.uninstall();
    }

    /// Returns whether the interception layer is installed.
    pub fn is_patched(&self) -> bool {
        self.controller.is_patched()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> PatchState {
        self.controller.state()
    }

    /// Reports a first load performed by a loader outside the runtime.
    ///
    /// The caller is responsible for reporting each module once.
    pub fn notify_loaded(&self, module_name: &str) -> DispatchReport {
        let event = LoadEvent::new(
            NameResolver::for_load(module_name),
            LoadTrigger::FirstLoad,
            LoadOutcome::Loaded,
        );
        debug!(module = %event.module, "Load reported by host");
        self.dispatcher.dispatch(&event)
    }

    /// Reports a reload performed by a loader outside the runtime.
    pub fn notify_reloaded(&self, module: &dyn ModuleIdentity) -> DispatchReport {
        let event = LoadEvent::reloaded(NameResolver::for_reload(module));
        debug!(module = %event.module, "Reload reported by host");
        self.dispatcher.dispatch(&event)
    }

    /// Returns the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// Returns the runtime.
    pub fn runtime(&self) -> &Arc<ModuleRuntime> {
        &self.runtime
    }

    /// Returns the patch controller.
    pub fn controller(&self) -> &PatchController {
        &self.controller
    }
}

impl Default for ImportHooks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct HostModule {
        name: &'static str,
    }

    impl ModuleIdentity for HostModule {
        fn spec_name(&self) -> Option<&str> {
            None
        }

        fn plain_name(&self) -> Option<&str> {
            Some(self.name)
        }
    }

    fn counted(hooks: &ImportHooks, name: &str) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        hooks.register_fn(name, "test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), anyhow::Error>(())
        });
        calls
    }

    #[test]
    fn test_notify_loaded_fires_without_patching() {
        let hooks = ImportHooks::new();
        let calls = counted(&hooks, "host.plugin");

        let report = hooks.notify_loaded("host.plugin");
        assert_eq!(report.invoked, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!hooks.is_patched());
    }

    #[test]
    fn test_notify_reloaded_uses_plain_name() {
        let hooks = ImportHooks::new();
        let calls = counted(&hooks, "host.plugin");

        hooks.notify_reloaded(&HostModule {
            name: "host.plugin",
        });
        hooks.notify_reloaded(&HostModule {
            name: "host.plugin",
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notify_with_empty_name_is_noop() {
        let hooks = ImportHooks::new();
        let calls = counted(&hooks, "");
        assert!(hooks.notify_loaded("").is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_install_and_uninstall_through_bundle() {
        let hooks = ImportHooks::new();
        hooks.install();
        assert_eq!(hooks.state(), PatchState::Patched);
        hooks.uninstall();
        assert_eq!(hooks.state(), PatchState::Unpatched);
    }
}
