//! Wrappers installed around runtime entry points.
//!
//! Every wrapper calls the original with the original arguments, then
//! dispatches hooks once the call has finished, whether it returned a module,
//! returned an error, or panicked. Hooks run when the module is available
//! afterwards: a failed first load leaves nothing in the cache and fires
//! nothing, while a failed reload leaves the module cached and fires again.
//! The original's outcome reaches the caller untouched: errors are returned
//! as is and panics are resumed after dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use crate::hooks::definitions::{LoadEvent, LoadOutcome, LoadTrigger, ResolvedName};
use crate::hooks::dispatcher::HookDispatcher;
use crate::resolver::NameResolver;
use crate::runtime::{LoadError, LoadFn, Module, ModuleRuntime, ReloadFn};
use crate::traits::panic_message;

/// Runs `call`, then dispatches hooks for `module` if it is available.
pub fn exec_and_dispatch<F>(
    runtime: &ModuleRuntime,
    dispatcher: &HookDispatcher,
    module: ResolvedName,
    trigger: LoadTrigger,
    call: F,
) -> Result<Arc<Module>, LoadError>
where
    F: FnOnce() -> Result<Arc<Module>, LoadError>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(call));

    let still_loaded = module
        .as_name()
        .is_some_and(|name| runtime.is_loaded(name));
    let outcome = match &result {
        Ok(Ok(_)) => LoadOutcome::Loaded,
        _ if still_loaded => LoadOutcome::Loaded,
        _ => LoadOutcome::Failed,
    };

    // Never let dispatch escape into the load path.
    let event = LoadEvent::new(module, trigger, outcome);
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&event))) {
        debug!(
            module = %event.module,
            error = %panic_message(payload.as_ref()),
            "Failed to call hooks for module"
        );
    }

    match result {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Wraps the find-and-load entry point.
///
/// The runtime only reaches this entry point for names missing from its
/// cache, so every successful call is a first load.
pub fn wrap_find_and_load(original: LoadFn, dispatcher: Arc<HookDispatcher>) -> LoadFn {
    Arc::new(
        move |runtime: &ModuleRuntime, name: &str| -> Result<Arc<Module>, LoadError> {
            let module = NameResolver::for_load(name);
            if module == ResolvedName::Unresolved {
                return original(runtime, name);
            }
            exec_and_dispatch(runtime, &dispatcher, module, LoadTrigger::FirstLoad, || {
                original(runtime, name)
            })
        },
    )
}

/// Wraps the reload entry point. Every call re-fires hooks.
pub fn wrap_reload(original: ReloadFn, dispatcher: Arc<HookDispatcher>) -> ReloadFn {
    Arc::new(
        move |runtime: &ModuleRuntime, module: &Arc<Module>| -> Result<Arc<Module>, LoadError> {
            let name = NameResolver::for_reload(module.as_ref());
            exec_and_dispatch(runtime, &dispatcher, name, LoadTrigger::Reload, || {
                original(runtime, module)
            })
        },
    )
}

/// Wraps the top-level import entry point of legacy runtimes.
///
/// Import runs for every import statement, cached or not, so the wrapper
/// checks the cache itself and only dispatches for names that were not
/// loaded before the call. The check and the call happen under the import
/// lock so two threads cannot both see the name as new.
pub fn wrap_import(original: LoadFn, dispatcher: Arc<HookDispatcher>) -> LoadFn {
    Arc::new(
        move |runtime: &ModuleRuntime, name: &str| -> Result<Arc<Module>, LoadError> {
            let module = NameResolver::for_load(name);
            if module == ResolvedName::Unresolved {
                return original(runtime, name);
            }

            let _guard = runtime.lock_imports();
            if runtime.is_loaded(name) {
                return original(runtime, name);
            }
            exec_and_dispatch(runtime, &dispatcher, module, LoadTrigger::FirstLoad, || {
                original(runtime, name)
            })
        },
    )
}
