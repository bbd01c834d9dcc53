//! Patch controller: installs and removes the interception layer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use autopatch_core::config::hooks::InterceptionMode;
use autopatch_core::{AgentError, AgentResult};

use crate::hooks::dispatcher::HookDispatcher;
use crate::intercept::{self, InterceptionStrategy};
use crate::runtime::{EntryFn, EntryPoint, ModuleRuntime};
use crate::traits::panic_message;

/// Whether the interception layer is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchState {
    /// Entry points are the runtime's own.
    Unpatched,
    /// Every target entry point carries our wrapper.
    Patched,
}

/// A wrapper we put in place, with the function it replaced.
struct InstalledWrapper {
    entry: EntryPoint,
    original: EntryFn,
    wrapper: EntryFn,
}

struct PatchInner {
    state: PatchState,
    mode: InterceptionMode,
    strategy: Option<InterceptionStrategy>,
    installed: Vec<InstalledWrapper>,
}

/// Idempotent install/uninstall of the interception layer on one runtime.
///
/// [`install`](Self::install) and [`uninstall`](Self::uninstall) never fail
/// from the caller's point of view: errors and panics are logged at debug
/// level and whatever was already done stays in place.
pub struct PatchController {
    /// Runtime whose entry points get wrapped.
    runtime: Arc<ModuleRuntime>,
    /// Dispatcher captured by every wrapper.
    dispatcher: Arc<HookDispatcher>,
    /// Lifecycle state; serializes install and uninstall.
    inner: Mutex<PatchInner>,
}

impl PatchController {
    /// Creates an unpatched controller.
    pub fn new(
        runtime: Arc<ModuleRuntime>,
        dispatcher: Arc<HookDispatcher>,
        mode: InterceptionMode,
    ) -> Self {
        Self {
            runtime,
            dispatcher,
            inner: Mutex::new(PatchInner {
                state: PatchState::Unpatched,
                mode,
                strategy: None,
                installed: Vec::new(),
            }),
        }
    }

    /// Installs the interception layer. Does nothing if already installed.
    pub fn install(&self) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_install())) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(error = %e, "Failed to patch module loading, import hooks will not work");
            }
            Err(payload) => {
                debug!(
                    error = %panic_message(payload.as_ref()),
                    "Failed to patch module loading, import hooks will not work"
                );
            }
        }
    }

    /// Removes the interception layer. Does nothing if not installed.
    pub fn uninstall(&self) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_uninstall())) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(error = %e, "Failed to unpatch module loading");
            }
            Err(payload) => {
                debug!(
                    error = %panic_message(payload.as_ref()),
                    "Failed to unpatch module loading"
                );
            }
        }
    }

    /// Installs the interception layer, reporting failures.
    ///
    /// Returns `false` when it was already installed. On failure the
    /// wrappers installed so far stay in place and are reused by the next
    /// attempt.
    pub fn try_install(&self) -> AgentResult<bool> {
        let mut inner = self.inner.lock();
        if inner.state == PatchState::Patched {
            return Ok(false);
        }

        let strategy = match inner.strategy {
            Some(strategy) => strategy,
            None => InterceptionStrategy::select(inner.mode, self.runtime.version()),
        };
        inner.strategy = Some(strategy);

        let entry_points = self.runtime.entry_points();
        for &entry in strategy.targets() {
            if inner.installed.iter().any(|w| w.entry == entry) {
                continue;
            }

            let original = entry_points.get(entry).ok_or_else(|| {
                AgentError::missing_entry_point(format!(
                    "runtime {} has no '{entry}' entry point",
                    self.runtime.version()
                ))
            })?;
            let wrapper = intercept::wrap(entry, original.clone(), self.dispatcher.clone())?;
            entry_points.set(entry, wrapper.clone())?;

            debug!(entry = %entry, strategy = %strategy, "Entry point wrapped");
            inner.installed.push(InstalledWrapper {
                entry,
                original,
                wrapper,
            });
        }

        inner.state = PatchState::Patched;
        info!(
            strategy = %strategy,
            version = %self.runtime.version(),
            "Module loading patched"
        );
        Ok(true)
    }

    /// Removes the interception layer, reporting failures.
    ///
    /// An entry point is restored only while it still holds our wrapper;
    /// anything installed on top of it since is left alone. Returns how
    /// many entry points were restored.
    pub fn try_uninstall(&self) -> AgentResult<usize> {
        let mut inner = self.inner.lock();
        if inner.state == PatchState::Unpatched && inner.installed.is_empty() {
            return Ok(0);
        }

        let entry_points = self.runtime.entry_points();
        let mut restored = 0;
        while let Some(installed) = inner.installed.pop() {
            match entry_points.get(installed.entry) {
                Some(current) if current.ptr_eq(&installed.wrapper) => {
                    entry_points.set(installed.entry, installed.original)?;
                    restored += 1;
                }
                _ => {
                    debug!(
                        entry = %installed.entry,
                        "Entry point was replaced after patching, leaving it in place"
                    );
                }
            }
        }

        inner.state = PatchState::Unpatched;
        inner.strategy = None;
        info!(restored, "Module loading unpatched");
        Ok(restored)
    }

    /// Returns the current state.
    pub fn state(&self) -> PatchState {
        self.inner.lock().state
    }

    /// Returns whether the interception layer is installed.
    pub fn is_patched(&self) -> bool {
        self.state() == PatchState::Patched
    }

    /// Returns the strategy in use, if any wrapper is in place.
    pub fn strategy(&self) -> Option<InterceptionStrategy> {
        self.inner.lock().strategy
    }

    /// Returns the configured strategy override.
    pub fn mode(&self) -> InterceptionMode {
        self.inner.lock().mode
    }

    /// Sets the strategy override used by the next install.
    pub fn set_mode(&self, mode: InterceptionMode) {
        self.inner.lock().mode = mode;
    }

    /// Returns the entry points currently carrying a recorded wrapper.
    pub fn wrapped_entry_points(&self) -> Vec<EntryPoint> {
        self.inner.lock().installed.iter().map(|w| w.entry).collect()
    }

    /// Returns the patched runtime.
    pub fn runtime(&self) -> &Arc<ModuleRuntime> {
        &self.runtime
    }
}

impl std::fmt::Debug for PatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PatchController")
            .field("state", &inner.state)
            .field("mode", &inner.mode)
            .field("strategy", &inner.strategy)
            .field("installed", &inner.installed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::registry::HookRegistry;

    fn controller(runtime: ModuleRuntime, mode: InterceptionMode) -> PatchController {
        let dispatcher = Arc::new(HookDispatcher::new(Arc::new(HookRegistry::new())));
        PatchController::new(Arc::new(runtime), dispatcher, mode)
    }

    fn snapshot(runtime: &ModuleRuntime) -> Vec<(EntryPoint, Option<EntryFn>)> {
        [EntryPoint::FindAndLoad, EntryPoint::Reload, EntryPoint::Import]
            .into_iter()
            .map(|entry| (entry, runtime.entry_points().get(entry)))
            .collect()
    }

    fn same(a: &Option<EntryFn>, b: &Option<EntryFn>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    #[test]
    fn test_install_picks_strategy_from_version() {
        let modern = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        modern.install();
        assert_eq!(modern.strategy(), Some(InterceptionStrategy::Modern));
        assert_eq!(
            modern.wrapped_entry_points(),
            vec![EntryPoint::FindAndLoad, EntryPoint::Reload]
        );

        let legacy = controller(ModuleRuntime::legacy(), InterceptionMode::Auto);
        legacy.install();
        assert_eq!(legacy.strategy(), Some(InterceptionStrategy::Legacy));
        assert_eq!(
            legacy.wrapped_entry_points(),
            vec![EntryPoint::Import, EntryPoint::Reload]
        );
    }

    #[test]
    fn test_double_install_is_single_layer() {
        let controller = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        assert!(controller.try_install().unwrap());
        let after_first = snapshot(controller.runtime());

        assert!(!controller.try_install().unwrap());
        let after_second = snapshot(controller.runtime());
        for ((_, a), (_, b)) in after_first.iter().zip(after_second.iter()) {
            assert!(same(a, b));
        }
    }

    #[test]
    fn test_uninstall_restores_originals_by_identity() {
        let controller = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        let before = snapshot(controller.runtime());

        controller.install();
        let patched = snapshot(controller.runtime());
        assert!(!same(&before[0].1, &patched[0].1));

        controller.uninstall();
        assert_eq!(controller.state(), PatchState::Unpatched);
        assert_eq!(controller.strategy(), None);
        for ((_, a), (_, b)) in before.iter().zip(snapshot(controller.runtime()).iter()) {
            assert!(same(a, b));
        }
    }

    #[test]
    fn test_uninstall_without_install_is_noop() {
        let controller = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        let before = snapshot(controller.runtime());
        assert_eq!(controller.try_uninstall().unwrap(), 0);
        for ((_, a), (_, b)) in before.iter().zip(snapshot(controller.runtime()).iter()) {
            assert!(same(a, b));
        }
    }

    #[test]
    fn test_foreign_rewrap_survives_uninstall() {
        let controller = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        controller.install();

        let runtime = controller.runtime();
        let ours = runtime.entry_points().reload_fn().unwrap();
        let foreign = EntryFn::Reload(Arc::new(
            move |rt: &ModuleRuntime,
                  module: &Arc<crate::runtime::Module>|
                  -> Result<Arc<crate::runtime::Module>, crate::runtime::LoadError> {
                ours(rt, module)
            },
        ));
        runtime
            .entry_points()
            .set(EntryPoint::Reload, foreign.clone())
            .unwrap();

        assert_eq!(controller.try_uninstall().unwrap(), 1);
        let current = runtime.entry_points().get(EntryPoint::Reload).unwrap();
        assert!(current.ptr_eq(&foreign));
        assert!(!controller.is_patched());
    }

    #[test]
    fn test_forced_modern_on_legacy_runtime_is_contained() {
        let controller = controller(ModuleRuntime::legacy(), InterceptionMode::Modern);
        let err = controller.try_install().unwrap_err();
        assert_eq!(err.kind, autopatch_core::ErrorKind::MissingEntryPoint);

        controller.install();
        assert!(!controller.is_patched());
        assert!(controller.wrapped_entry_points().is_empty());
    }

    #[test]
    fn test_partial_install_is_kept_and_completed_later() {
        let controller = controller(ModuleRuntime::legacy(), InterceptionMode::Auto);
        let runtime = controller.runtime().clone();
        let reload = runtime.entry_points().remove(EntryPoint::Reload).unwrap();

        controller.install();
        assert!(!controller.is_patched());
        assert_eq!(controller.wrapped_entry_points(), vec![EntryPoint::Import]);
        let wrapped_import = runtime.entry_points().get(EntryPoint::Import).unwrap();

        runtime.entry_points().set(EntryPoint::Reload, reload).unwrap();
        controller.install();
        assert!(controller.is_patched());
        assert!(
            runtime
                .entry_points()
                .get(EntryPoint::Import)
                .unwrap()
                .ptr_eq(&wrapped_import)
        );
    }

    #[test]
    fn test_uninstall_after_partial_install_restores() {
        let controller = controller(ModuleRuntime::legacy(), InterceptionMode::Auto);
        let runtime = controller.runtime().clone();
        let original_import = runtime.entry_points().get(EntryPoint::Import).unwrap();
        runtime.entry_points().remove(EntryPoint::Reload);

        controller.install();
        assert_eq!(controller.try_uninstall().unwrap(), 1);
        assert!(
            runtime
                .entry_points()
                .get(EntryPoint::Import)
                .unwrap()
                .ptr_eq(&original_import)
        );
    }

    #[test]
    fn test_set_mode_applies_to_next_install() {
        let controller = controller(ModuleRuntime::modern(), InterceptionMode::Auto);
        controller.set_mode(InterceptionMode::Legacy);
        controller.install();
        assert_eq!(controller.strategy(), Some(InterceptionStrategy::Legacy));
        assert_eq!(controller.mode(), InterceptionMode::Legacy);
    }
}
