//! Module name resolution for load and reload events.
//!
//! Loads receive the name directly. Reloads only receive the module object,
//! whose identity is exposed in one of two ways depending on the runtime
//! generation: a structured spec carrying the name, or a plain name
//! attribute. The spec wins when present.

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use autopatch_core::{AgentError, AgentResult};

use crate::hooks::definitions::ResolvedName;
use crate::traits::panic_message;

/// Identity surface of a loaded module.
pub trait ModuleIdentity {
    /// Name carried by the module's structured spec, if it has one.
    fn spec_name(&self) -> Option<&str>;

    /// Plain name attribute, if set.
    fn plain_name(&self) -> Option<&str>;
}

/// Best-effort module name extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl NameResolver {
    /// Resolves the name passed positionally to a load entry point.
    pub fn for_load(name: &str) -> ResolvedName {
        if name.is_empty() {
            debug!("Failed to determine module name when importing module: empty name");
            return ResolvedName::Unresolved;
        }
        ResolvedName::Named(name.to_string())
    }

    /// Resolves the name of a module being reloaded.
    ///
    /// Never fails: errors and panics raised while reading the module's
    /// identity are logged and turned into [`ResolvedName::Unresolved`].
    pub fn for_reload(module: &dyn ModuleIdentity) -> ResolvedName {
        let result = panic::catch_unwind(AssertUnwindSafe(|| Self::try_for_reload(module)))
            .unwrap_or_else(|payload| {
                Err(AgentError::resolution(format!(
                    "panic while reading module identity: {}",
                    panic_message(payload.as_ref())
                )))
            });

        match result {
            Ok(name) => ResolvedName::Named(name),
            Err(e) => {
                debug!(error = %e, "Failed to determine module name when calling reload");
                ResolvedName::Unresolved
            }
        }
    }

    /// Reads the spec name, falling back to the plain name.
    pub fn try_for_reload(module: &dyn ModuleIdentity) -> AgentResult<String> {
        module
            .spec_name()
            .or_else(|| module.plain_name())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AgentError::resolution("module exposes neither a spec nor a name"))
    }
}
