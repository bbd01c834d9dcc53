//! Interception strategies: which entry points get wrapped, and how.

pub mod wrappers;

use std::sync::Arc;

use autopatch_core::config::hooks::InterceptionMode;
use autopatch_core::{AgentError, AgentResult};

use crate::hooks::dispatcher::HookDispatcher;
use crate::runtime::{EntryFn, EntryPoint, RuntimeVersion};

/// The set of entry points wrapped for one runtime generation.
///
/// Both variants share the dispatch contract and always wrap `Reload`; they
/// differ in which entry point signals a first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptionStrategy {
    /// Wrap `FindAndLoad` and `Reload`.
    Modern,
    /// Wrap `Import` and `Reload`, deduplicating cached imports in the wrapper.
    Legacy,
}

impl InterceptionStrategy {
    /// Picks the strategy for a runtime generation.
    pub fn for_version(version: RuntimeVersion) -> Self {
        if version.has_find_and_load() {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    /// Applies a configured override, falling back to the version.
    pub fn select(mode: InterceptionMode, version: RuntimeVersion) -> Self {
        match mode {
            InterceptionMode::Auto => Self::for_version(version),
            InterceptionMode::Modern => Self::Modern,
            InterceptionMode::Legacy => Self::Legacy,
        }
    }

    /// Returns the entry points this strategy wraps, in install order.
    pub fn targets(&self) -> &'static [EntryPoint] {
        match self {
            Self::Modern => &[EntryPoint::FindAndLoad, EntryPoint::Reload],
            Self::Legacy => &[EntryPoint::Import, EntryPoint::Reload],
        }
    }

    /// Returns the string name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for InterceptionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the wrapper for `entry` around `original`.
pub fn wrap(
    entry: EntryPoint,
    original: EntryFn,
    dispatcher: Arc<HookDispatcher>,
) -> AgentResult<EntryFn> {
    match (entry, original) {
        (EntryPoint::FindAndLoad, EntryFn::Load(f)) => {
            Ok(EntryFn::Load(wrappers::wrap_find_and_load(f, dispatcher)))
        }
        (EntryPoint::Import, EntryFn::Load(f)) => {
            Ok(EntryFn::Load(wrappers::wrap_import(f, dispatcher)))
        }
        (EntryPoint::Reload, EntryFn::Reload(f)) => {
            Ok(EntryFn::Reload(wrappers::wrap_reload(f, dispatcher)))
        }
        (entry, original) => Err(AgentError::patch(format!(
            "entry point '{entry}' holds an unexpected function {original:?}"
        ))),
    }
}
