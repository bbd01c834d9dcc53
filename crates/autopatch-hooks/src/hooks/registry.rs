//! Hook registry: module name → hooks in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::traits::{ClosureHook, HookHandler};

/// Entry in the hook registry.
#[derive(Debug)]
struct HookEntry {
    /// The hook.
    handler: Arc<dyn HookHandler>,
    /// Owner label captured at registration.
    owner: String,
}

/// Registry of hooks keyed by exact module name.
///
/// Keys are compared verbatim: case-sensitive, dotted paths untouched.
/// Duplicates are kept, so registering the same hook twice runs it twice.
#[derive(Debug)]
pub struct HookRegistry {
    /// Module name → hooks in insertion order.
    hooks: RwLock<HashMap<String, Vec<HookEntry>>>,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a hook for `module_name`.
    pub fn register(&self, module_name: impl Into<String>, handler: Arc<dyn HookHandler>) {
        let module_name = module_name.into();
        let owner = handler.owner().to_string();

        let mut hooks = self.hooks.write();
        let entries = hooks.entry(module_name.clone()).or_default();
        entries.push(HookEntry {
            handler,
            owner: owner.clone(),
        });

        debug!(
            module = %module_name,
            owner = %owner,
            position = entries.len(),
            "Import hook registered"
        );
    }

    /// Appends a closure hook for `module_name`.
    pub fn register_fn<F, E>(&self, module_name: impl Into<String>, owner: &str, callback: F)
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        self.register(module_name, ClosureHook::new(owner, callback).into_handler());
    }

    /// Removes every hook for `module_name`, returning how many were dropped.
    pub fn deregister(&self, module_name: &str) -> usize {
        let removed = self
            .hooks
            .write()
            .remove(module_name)
            .map(|entries| entries.len())
            .unwrap_or(0);

        if removed > 0 {
            debug!(module = %module_name, removed, "Import hooks deregistered");
        }
        removed
    }

    /// Removes every hook for every module.
    pub fn clear(&self) {
        self.hooks.write().clear();
    }

    /// Returns a snapshot of the hooks for `module_name`, in order.
    pub fn hooks_for(&self, module_name: &str) -> Vec<Arc<dyn HookHandler>> {
        let hooks = self.hooks.read();
        hooks
            .get(module_name)
            .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns whether any hooks are registered for `module_name`.
    pub fn has_hooks(&self, module_name: &str) -> bool {
        let hooks = self.hooks.read();
        hooks
            .get(module_name)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of hooks registered for `module_name`.
    pub fn hook_count(&self, module_name: &str) -> usize {
        let hooks = self.hooks.read();
        hooks.get(module_name).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns all module names with at least one hook, sorted.
    pub fn registered_modules(&self) -> Vec<String> {
        let hooks = self.hooks.read();
        let mut names: Vec<String> = hooks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the owner labels for `module_name`, in order.
    pub fn owners_for(&self, module_name: &str) -> Vec<String> {
        let hooks = self.hooks.read();
        hooks
            .get(module_name)
            .map(|entries| entries.iter().map(|e| e.owner.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
