//! # autopatch-hooks
//!
//! Module load hooks for the autopatch agent. Provides:
//!
//! - Hook registry keyed by exact module name, insertion-ordered
//! - Hook dispatcher with per-hook failure isolation
//! - An embeddable module runtime with a swappable entry-point table
//! - Interception wrappers for modern and legacy runtime generations
//! - Idempotent install/uninstall through the patch controller

pub mod hooks;
pub mod import_hooks;
pub mod intercept;
pub mod patch;
pub mod prelude;
pub mod resolver;
pub mod runtime;
pub mod traits;

pub use hooks::definitions::{LoadEvent, LoadOutcome, LoadTrigger, ResolvedName};
pub use hooks::dispatcher::{DispatchReport, HookDispatcher};
pub use hooks::registry::HookRegistry;
pub use import_hooks::ImportHooks;
pub use intercept::InterceptionStrategy;
pub use patch::{PatchController, PatchState};
pub use resolver::{ModuleIdentity, NameResolver};
pub use runtime::{
    EntryFn, EntryPoint, EntryPoints, LoadError, Module, ModuleRuntime, ModuleSpec, RuntimeVersion,
    StaticSource,
};
pub use traits::{ClosureHook, HookFailure, HookHandler};
