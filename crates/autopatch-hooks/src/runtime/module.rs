//! Loaded module objects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::ModuleIdentity;

/// Structured description of where a module came from.
///
/// Only modern runtimes attach one to their modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Canonical dotted name.
    pub name: String,
    /// Where the source was found, if the source reports it.
    pub origin: Option<String>,
}

/// A module loaded into a [`ModuleRuntime`](super::ModuleRuntime).
///
/// Attributes are the module's namespace: the body populates them and
/// hooks patch them.
#[derive(Debug)]
pub struct Module {
    /// Name the module was loaded under.
    name: String,
    /// Spec, on modern runtimes.
    spec: Option<ModuleSpec>,
    /// Number of times the body has run (1 after first load).
    executions: AtomicU32,
    /// Module namespace.
    attributes: RwLock<HashMap<String, Value>>,
}

impl Module {
    /// Creates an empty, not yet executed module.
    pub fn new(name: impl Into<String>, spec: Option<ModuleSpec>) -> Self {
        Self {
            name: name.into(),
            spec,
            executions: AtomicU32::new(0),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the name the module was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the module spec, if any.
    pub fn spec(&self) -> Option<&ModuleSpec> {
        self.spec.as_ref()
    }

    /// Returns how many times the body has run.
    pub fn executions(&self) -> u32 {
        self.executions.load(Ordering::SeqCst)
    }

    pub(crate) fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::SeqCst);
    }

    /// Sets an attribute.
    pub fn set_attr(&self, key: &str, value: Value) {
        self.attributes.write().insert(key.to_string(), value);
    }

    /// Gets an attribute.
    pub fn get_attr(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }
}

impl ModuleIdentity for Module {
    fn spec_name(&self) -> Option<&str> {
        self.spec.as_ref().map(|spec| spec.name.as_str())
    }

    fn plain_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}
