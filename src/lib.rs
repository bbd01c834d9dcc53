//! # autopatch
//!
//! Automatic instrumentation agent. Libraries register a hook for a module
//! name; once the process-wide interception layer is installed, the hook
//! runs every time that module is loaded for the first time or reloaded
//! through the agent's module runtime.
//!
//! ```rust,ignore
//! autopatch::register_fn("db.client", "db-tracing", || {
//!     // patch the client here
//!     Ok::<(), anyhow::Error>(())
//! });
//! autopatch::install();
//! autopatch::runtime().import("db.client")?;
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::info;

pub use autopatch_core;
pub use autopatch_hooks;
pub use autopatch_metrics;

use autopatch_core::AgentResult;
use autopatch_core::config::AgentConfig;
use autopatch_core::logging::init_logging;
use autopatch_hooks::{HookHandler, ImportHooks, ModuleRuntime};

static IMPORT_HOOKS: Lazy<ImportHooks> = Lazy::new(ImportHooks::new);

/// Returns the process-wide import hooks.
pub fn hooks() -> &'static ImportHooks {
    &IMPORT_HOOKS
}

/// Returns the process-wide module runtime.
pub fn runtime() -> &'static Arc<ModuleRuntime> {
    IMPORT_HOOKS.runtime()
}

/// Registers `hook` for `module_name`. Never fails.
pub fn register(module_name: impl Into<String>, hook: Arc<dyn HookHandler>) {
    IMPORT_HOOKS.register(module_name, hook);
}

/// Registers a closure hook for `module_name`. Never fails.
pub fn register_fn<F, E>(module_name: impl Into<String>, owner: &str, callback: F)
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: Into<anyhow::Error> + 'static,
{
    IMPORT_HOOKS.register_fn(module_name, owner, callback);
}

/// Installs the process-wide interception layer. Idempotent, never fails.
pub fn install() {
    IMPORT_HOOKS.install();
}

/// Removes the process-wide interception layer. Idempotent, never fails.
pub fn uninstall() {
    IMPORT_HOOKS.uninstall();
}

/// Returns whether the process-wide interception layer is installed.
pub fn is_patched() -> bool {
    IMPORT_HOOKS.is_patched()
}

/// Starts the agent: logging first, then the interception layer if enabled.
pub fn bootstrap(config: &AgentConfig) {
    init_logging(&config.logging);

    let controller = IMPORT_HOOKS.controller();
    controller.set_mode(config.hooks.mode);

    if config.hooks.enabled {
        install();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        enabled = config.hooks.enabled,
        mode = %config.hooks.mode,
        patched = is_patched(),
        "Agent started"
    );
}

/// Loads the configuration from the environment and starts the agent.
pub fn bootstrap_from_env() -> AgentResult<AgentConfig> {
    let config = AgentConfig::from_env()?;
    bootstrap(&config);
    Ok(config)
}
