//! Module sources: where the runtime finds the code for a name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ModuleRuntime;
use super::module::Module;

/// Executable body of a module.
///
/// Runs on first load and again on every reload, against the same module
/// object. May import other modules through the runtime.
pub type ModuleBody = Arc<dyn Fn(&ModuleRuntime, &Module) -> anyhow::Result<()> + Send + Sync>;

/// What a source returns for a name it can provide.
#[derive(Clone)]
pub struct ModuleDefinition {
    /// Where the definition came from, for the module spec.
    pub origin: Option<String>,
    /// The body.
    pub body: ModuleBody,
}

impl std::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("origin", &self.origin)
            .field("body", &"<fn>")
            .finish()
    }
}

/// A provider of module definitions, consulted in registration order.
pub trait ModuleSource: Send + Sync {
    /// Returns the definition for `name`, or `None` if this source does not
    /// provide it.
    fn find(&self, name: &str) -> Option<ModuleDefinition>;
}

/// In-memory source keyed by module name.
#[derive(Default)]
pub struct StaticSource {
    /// Name → definition.
    definitions: RwLock<HashMap<String, ModuleDefinition>>,
    /// Label used as the origin of every definition.
    label: String,
}

impl StaticSource {
    /// Creates an empty source whose modules report `label` as origin.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            label: label.into(),
        }
    }

    /// Defines (or redefines) a module.
    pub fn define<F>(&self, name: &str, body: F)
    where
        F: Fn(&ModuleRuntime, &Module) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let definition = ModuleDefinition {
            origin: Some(format!("{}:{}", self.label, name)),
            body: Arc::new(body),
        };
        self.definitions.write().insert(name.to_string(), definition);
    }

    /// Defines a module whose body does nothing.
    pub fn define_empty(&self, name: &str) {
        self.define(name, |_, _| Ok(()));
    }
}

impl std::fmt::Debug for StaticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSource")
            .field("label", &self.label)
            .field("module_count", &self.definitions.read().len())
            .finish()
    }
}

impl ModuleSource for StaticSource {
    fn find(&self, name: &str) -> Option<ModuleDefinition> {
        self.definitions.read().get(name).cloned()
    }
}
