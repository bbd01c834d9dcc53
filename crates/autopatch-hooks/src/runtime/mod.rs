//! Module runtime: an embeddable loader with a module cache and a swappable
//! entry-point table.
//!
//! Hosts route every module load through [`ModuleRuntime::import`] and every
//! explicit re-execution through [`ModuleRuntime::reload`]. Both dispatch
//! through the [`EntryPoints`] table, which is what the interception layer
//! wraps.
//!
//! Two runtime generations exist:
//!
//! - From [`RuntimeVersion::FIND_AND_LOAD_SINCE`], `import` consults the
//!   cache and delegates uncached names to the `FindAndLoad` entry point,
//!   and modules carry a [`ModuleSpec`].
//! - Before that, `import` loads uncached names itself and modules only
//!   carry a plain name.

pub mod entry;
pub mod error;
pub mod module;
pub mod source;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::debug;

pub use entry::{EntryFn, EntryPoint, EntryPoints, LoadFn, ReloadFn};
pub use error::LoadError;
pub use module::{Module, ModuleSpec};
pub use source::{ModuleBody, ModuleDefinition, ModuleSource, StaticSource};

/// Runtime generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl RuntimeVersion {
    /// First version with a separate find-and-load entry point and module specs.
    pub const FIND_AND_LOAD_SINCE: RuntimeVersion = RuntimeVersion::new(2, 0);

    /// Version used by [`ModuleRuntime::modern`].
    pub const CURRENT: RuntimeVersion = RuntimeVersion::new(2, 1);

    /// Version used by [`ModuleRuntime::legacy`].
    pub const LEGACY: RuntimeVersion = RuntimeVersion::new(1, 9);

    /// Creates a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns whether this generation has the `FindAndLoad` entry point.
    pub fn has_find_and_load(&self) -> bool {
        *self >= Self::FIND_AND_LOAD_SINCE
    }
}

impl std::fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// An embeddable module loader.
pub struct ModuleRuntime {
    /// Runtime generation.
    version: RuntimeVersion,
    /// Loaded modules by name.
    modules: RwLock<HashMap<String, Arc<Module>>>,
    /// Sources consulted in order.
    sources: RwLock<Vec<Arc<dyn ModuleSource>>>,
    /// Entry-point table.
    entry_points: EntryPoints,
    /// Serializes loads; re-entrant so module bodies and hooks can import.
    import_lock: ReentrantMutex<()>,
}

impl ModuleRuntime {
    /// Creates a runtime of the given generation with its builtin entry points.
    pub fn new(version: RuntimeVersion) -> Self {
        let runtime = Self {
            version,
            modules: RwLock::new(HashMap::new()),
            sources: RwLock::new(Vec::new()),
            entry_points: EntryPoints::new(),
            import_lock: ReentrantMutex::new(()),
        };

        let import: LoadFn = Arc::new(builtin_import);
        let reload: ReloadFn = Arc::new(builtin_reload);
        runtime.entry_points.install(EntryPoint::Import, EntryFn::Load(import));
        runtime.entry_points.install(EntryPoint::Reload, EntryFn::Reload(reload));

        if version.has_find_and_load() {
            let find_and_load: LoadFn = Arc::new(builtin_find_and_load);
            runtime
                .entry_points
                .install(EntryPoint::FindAndLoad, EntryFn::Load(find_and_load));
        }

        runtime
    }

    /// Creates a current-generation runtime.
    pub fn modern() -> Self {
        Self::new(RuntimeVersion::CURRENT)
    }

    /// Creates a legacy-generation runtime.
    pub fn legacy() -> Self {
        Self::new(RuntimeVersion::LEGACY)
    }

    /// Returns the runtime generation.
    pub fn version(&self) -> RuntimeVersion {
        self.version
    }

    /// Returns the entry-point table.
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Appends a module source.
    pub fn add_source(&self, source: Arc<dyn ModuleSource>) {
        self.sources.write().push(source);
    }

    /// Imports `name`, loading it if it is not cached yet.
    pub fn import(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        let import = self
            .entry_points
            .load_fn(EntryPoint::Import)
            .ok_or(LoadError::MissingEntryPoint {
                entry: EntryPoint::Import.as_str(),
            })?;
        import(self, name)
    }

    /// Re-executes an already-loaded module.
    pub fn reload(&self, module: &Arc<Module>) -> Result<Arc<Module>, LoadError> {
        let reload = self
            .entry_points
            .reload_fn()
            .ok_or(LoadError::MissingEntryPoint {
                entry: EntryPoint::Reload.as_str(),
            })?;
        reload(self, module)
    }

    /// Returns whether `name` is in the module cache.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    /// Returns the cached module for `name`.
    pub fn get_module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.read().get(name).cloned()
    }

    /// Returns the names of all cached modules, sorted.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops `name` from the cache so the next import loads it afresh.
    pub fn forget(&self, name: &str) -> Option<Arc<Module>> {
        let _guard = self.lock_imports();
        self.modules.write().remove(name)
    }

    /// Acquires the import lock. Re-entrant on the same thread.
    pub fn lock_imports(&self) -> ReentrantMutexGuard<'_, ()> {
        self.import_lock.lock()
    }

    fn find_definition(&self, name: &str) -> Option<ModuleDefinition> {
        let sources = self.sources.read().clone();
        sources.iter().find_map(|source| source.find(name))
    }

    fn execute(&self, definition: &ModuleDefinition, module: &Module) -> anyhow::Result<()> {
        module.record_execution();
        (definition.body)(self, module)
    }

    /// Loads a module that is not cached: imports its parent package,
    /// finds its definition, caches it, and runs its body.
    ///
    /// The cache entry is removed again if the body fails or panics.
    fn load_uncached(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        let _guard = self.lock_imports();

        if let Some((parent, _)) = name.rsplit_once('.') {
            if !self.is_loaded(parent) {
                self.import(parent)?;
            }
        }

        let definition = self.find_definition(name).ok_or_else(|| LoadError::NotFound {
            name: name.to_string(),
        })?;

        let spec = self.version.has_find_and_load().then(|| ModuleSpec {
            name: name.to_string(),
            origin: definition.origin.clone(),
        });
        let module = Arc::new(Module::new(name, spec));
        self.modules.write().insert(name.to_string(), module.clone());

        let evict = scopeguard::guard((), |_| {
            self.modules.write().remove(name);
        });
        self.execute(&definition, &module)
            .map_err(|source| LoadError::Execution {
                name: name.to_string(),
                source,
            })?;
        scopeguard::ScopeGuard::into_inner(evict);

        debug!(module = %name, version = %self.version, "Module loaded");
        Ok(module)
    }
}

impl std::fmt::Debug for ModuleRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRuntime")
            .field("version", &self.version)
            .field("loaded", &self.modules.read().len())
            .field("sources", &self.sources.read().len())
            .field("entry_points", &self.entry_points)
            .finish()
    }
}

fn builtin_import(runtime: &ModuleRuntime, name: &str) -> Result<Arc<Module>, LoadError> {
    let _guard = runtime.lock_imports();
    if let Some(module) = runtime.get_module(name) {
        return Ok(module);
    }

    match runtime.entry_points.load_fn(EntryPoint::FindAndLoad) {
        Some(find_and_load) => find_and_load(runtime, name),
        None => runtime.load_uncached(name),
    }
}

fn builtin_find_and_load(runtime: &ModuleRuntime, name: &str) -> Result<Arc<Module>, LoadError> {
    runtime.load_uncached(name)
}

fn builtin_reload(
    runtime: &ModuleRuntime,
    module: &Arc<Module>,
) -> Result<Arc<Module>, LoadError> {
    let _guard = runtime.lock_imports();
    let name = module.name();

    match runtime.get_module(name) {
        Some(cached) if Arc::ptr_eq(&cached, module) => {}
        _ => {
            return Err(LoadError::NotLoaded {
                name: name.to_string(),
            });
        }
    }

    let definition = runtime
        .find_definition(name)
        .ok_or_else(|| LoadError::NotFound {
            name: name.to_string(),
        })?;
    runtime
        .execute(&definition, module)
        .map_err(|source| LoadError::Execution {
            name: name.to_string(),
            source,
        })?;

    debug!(module = %name, executions = module.executions(), "Module reloaded");
    Ok(module.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn runtime_with(version: RuntimeVersion) -> (ModuleRuntime, Arc<StaticSource>) {
        let runtime = ModuleRuntime::new(version);
        let source = Arc::new(StaticSource::new("test"));
        runtime.add_source(source.clone());
        (runtime, source)
    }

    #[test]
    fn test_generations_expose_different_entry_points() {
        let modern = ModuleRuntime::modern();
        assert!(modern.entry_points().contains(EntryPoint::FindAndLoad));
        assert!(modern.entry_points().contains(EntryPoint::Import));

        let legacy = ModuleRuntime::legacy();
        assert!(!legacy.entry_points().contains(EntryPoint::FindAndLoad));
        assert!(legacy.entry_points().contains(EntryPoint::Reload));
    }

    #[test]
    fn test_import_caches_module() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define("alpha", |_, module| {
            module.set_attr("answer", json!(42));
            Ok(())
        });

        let first = runtime.import("alpha").unwrap();
        let second = runtime.import("alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.executions(), 1);
        assert_eq!(first.get_attr("answer"), Some(json!(42)));
        assert_eq!(first.spec().map(|s| s.name.as_str()), Some("alpha"));
    }

    #[test]
    fn test_legacy_modules_have_no_spec() {
        let (runtime, source) = runtime_with(RuntimeVersion::LEGACY);
        source.define_empty("alpha");
        assert!(runtime.import("alpha").unwrap().spec().is_none());
    }

    #[test]
    fn test_dotted_import_loads_parent_first() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define_empty("pkg");
        source.define_empty("pkg.sub");

        runtime.import("pkg.sub").unwrap();
        assert_eq!(runtime.loaded_modules(), vec!["pkg", "pkg.sub"]);
    }

    #[test]
    fn test_failed_body_is_not_cached() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define("broken", |_, _| Err(anyhow::anyhow!("syntax error")));

        let err = runtime.import("broken").unwrap_err();
        assert!(matches!(err, LoadError::Execution { .. }));
        assert!(!runtime.is_loaded("broken"));
    }

    #[test]
    fn test_panicking_body_is_not_cached() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define("explosive", |_, _| panic!("module body panicked"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runtime.import("explosive")
        }));
        assert!(result.is_err());
        assert!(!runtime.is_loaded("explosive"));
    }

    #[test]
    fn test_missing_module() {
        let (runtime, _) = runtime_with(RuntimeVersion::CURRENT);
        let err = runtime.import("nope").unwrap_err();
        assert_eq!(err.module_name(), Some("nope"));
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_reload_reexecutes_same_object() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define_empty("alpha");

        let module = runtime.import("alpha").unwrap();
        let reloaded = runtime.reload(&module).unwrap();
        assert!(Arc::ptr_eq(&module, &reloaded));
        assert_eq!(module.executions(), 2);
    }

    #[test]
    fn test_reload_of_forgotten_module_fails() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define_empty("alpha");

        let module = runtime.import("alpha").unwrap();
        runtime.forget("alpha");
        assert!(matches!(
            runtime.reload(&module),
            Err(LoadError::NotLoaded { .. })
        ));
    }

    #[test]
    fn test_module_body_can_import() {
        let (runtime, source) = runtime_with(RuntimeVersion::CURRENT);
        source.define_empty("dep");
        source.define("app", |runtime, module| {
            let dep = runtime.import("dep")?;
            module.set_attr("dep", json!(dep.name()));
            Ok(())
        });

        let app = runtime.import("app").unwrap();
        assert_eq!(app.get_attr("dep"), Some(json!("dep")));
        assert!(runtime.is_loaded("dep"));
    }
}
