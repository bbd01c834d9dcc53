//! Prelude for convenient imports.

pub use crate::hooks::definitions::{LoadTrigger, ResolvedName};
pub use crate::import_hooks::ImportHooks;
pub use crate::resolver::ModuleIdentity;
pub use crate::runtime::{LoadError, Module, ModuleRuntime, ModuleSource, StaticSource};
pub use crate::traits::{ClosureHook, HookFailure, HookHandler};

pub use autopatch_core::config::hooks::InterceptionMode;
