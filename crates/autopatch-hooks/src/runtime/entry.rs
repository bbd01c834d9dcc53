//! The runtime's entry-point table.
//!
//! Every way of bringing a module into the runtime goes through one of
//! these functions, and each can be swapped at run time. Identity of an
//! installed function is pointer identity of its `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use autopatch_core::{AgentError, AgentResult};

use super::ModuleRuntime;
use super::error::LoadError;
use super::module::Module;

/// Entry point taking a module name: find-and-load and import.
pub type LoadFn =
    Arc<dyn Fn(&ModuleRuntime, &str) -> Result<Arc<Module>, LoadError> + Send + Sync>;

/// Entry point taking a loaded module: reload.
pub type ReloadFn =
    Arc<dyn Fn(&ModuleRuntime, &Arc<Module>) -> Result<Arc<Module>, LoadError> + Send + Sync>;

/// Named slots of the entry-point table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Load a module that is not cached yet. Absent on legacy runtimes.
    FindAndLoad,
    /// Re-execute an already-loaded module.
    Reload,
    /// Top-level import by name; consults the cache first.
    Import,
}

impl EntryPoint {
    /// Returns the string name of this entry point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindAndLoad => "find_and_load",
            Self::Reload => "reload",
            Self::Import => "import",
        }
    }

    fn takes_module(&self) -> bool {
        matches!(self, Self::Reload)
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A function installed in an entry-point slot.
#[derive(Clone)]
pub enum EntryFn {
    /// Name-taking function.
    Load(LoadFn),
    /// Module-taking function.
    Reload(ReloadFn),
}

impl EntryFn {
    /// Returns whether both values are the very same installed function.
    pub fn ptr_eq(&self, other: &EntryFn) -> bool {
        match (self, other) {
            (Self::Load(a), Self::Load(b)) => Arc::ptr_eq(a, b),
            (Self::Reload(a), Self::Reload(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn fits(&self, entry: EntryPoint) -> bool {
        matches!(self, Self::Reload(_)) == entry.takes_module()
    }
}

impl std::fmt::Debug for EntryFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(func) => write!(f, "EntryFn::Load({:p})", Arc::as_ptr(func)),
            Self::Reload(func) => write!(f, "EntryFn::Reload({:p})", Arc::as_ptr(func)),
        }
    }
}

/// Swappable table of entry points.
#[derive(Debug, Default)]
pub struct EntryPoints {
    /// Slot → installed function.
    slots: RwLock<HashMap<EntryPoint, EntryFn>>,
}

impl EntryPoints {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the function currently installed for `entry`.
    pub fn get(&self, entry: EntryPoint) -> Option<EntryFn> {
        self.slots.read().get(&entry).cloned()
    }

    /// Returns whether `entry` has a function installed.
    pub fn contains(&self, entry: EntryPoint) -> bool {
        self.slots.read().contains_key(&entry)
    }

    /// Installs `func` for `entry`, returning the previous function.
    ///
    /// Fails when the function's shape does not match the slot.
    pub fn set(&self, entry: EntryPoint, func: EntryFn) -> AgentResult<Option<EntryFn>> {
        if !func.fits(entry) {
            return Err(AgentError::internal(format!(
                "cannot install {func:?} into the '{entry}' entry point"
            )));
        }
        Ok(self.slots.write().insert(entry, func))
    }

    /// Installs a builtin without shape checking.
    pub(crate) fn install(&self, entry: EntryPoint, func: EntryFn) {
        self.slots.write().insert(entry, func);
    }

    /// Removes the function installed for `entry`.
    pub fn remove(&self, entry: EntryPoint) -> Option<EntryFn> {
        self.slots.write().remove(&entry)
    }

    /// Returns the name-taking function installed for `entry`.
    pub fn load_fn(&self, entry: EntryPoint) -> Option<LoadFn> {
        match self.get(entry) {
            Some(EntryFn::Load(func)) => Some(func),
            _ => None,
        }
    }

    /// Returns the reload function.
    pub fn reload_fn(&self) -> Option<ReloadFn> {
        match self.get(EntryPoint::Reload) {
            Some(EntryFn::Reload(func)) => Some(func),
            _ => None,
        }
    }
}
