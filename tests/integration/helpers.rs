//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;

use autopatch::autopatch_hooks::StaticSource;

/// Module source attached to the global runtime on first use.
static SOURCE: Lazy<Arc<StaticSource>> = Lazy::new(|| {
    let source = Arc::new(StaticSource::new("integration"));
    autopatch::runtime().add_source(source.clone());
    source
});

/// Defines an empty module on the global runtime.
///
/// The registry and module cache are process-wide, so every test uses its
/// own module names.
pub fn define_module(name: &str) {
    SOURCE.define_empty(name);
}

/// Registers a counting hook on the global registry.
pub fn count_loads(module_name: &str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    autopatch::register_fn(module_name, "integration", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<(), anyhow::Error>(())
    });
    calls
}

/// Reads a counter.
pub fn loads(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}
