//! Load event definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A module name as far as the resolver could tell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedName {
    /// The canonical dotted module name.
    Named(String),
    /// Extraction failed; dispatch treats this as an absent key.
    Unresolved,
}

impl ResolvedName {
    /// Returns the name, if one was resolved.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Unresolved => None,
        }
    }
}

impl From<&str> for ResolvedName {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl std::fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Unresolved => write!(f, "<unresolved>"),
        }
    }
}

/// What caused the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadTrigger {
    /// The module was made available for the first time.
    FirstLoad,
    /// An already-loaded module was explicitly re-executed.
    Reload,
}

impl LoadTrigger {
    /// Returns the string name of this trigger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstLoad => "first_load",
            Self::Reload => "reload",
        }
    }
}

impl std::fmt::Display for LoadTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the module is available once the underlying call has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The call returned a module, or failed while the module stayed loaded.
    Loaded,
    /// The call failed and the module is not loaded.
    Failed,
}

/// A single load or reload observation, created per call and dropped
/// after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadEvent {
    /// The module concerned.
    pub module: ResolvedName,
    /// First load or reload.
    pub trigger: LoadTrigger,
    /// Availability of the module after the call.
    pub outcome: LoadOutcome,
    /// When the underlying call completed.
    pub timestamp: DateTime<Utc>,
}

impl LoadEvent {
    /// Creates a new event stamped with the current time.
    pub fn new(module: ResolvedName, trigger: LoadTrigger, outcome: LoadOutcome) -> Self {
        Self {
            module,
            trigger,
            outcome,
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for a successful first load of `name`.
    pub fn loaded(name: &str) -> Self {
        Self::new(name.into(), LoadTrigger::FirstLoad, LoadOutcome::Loaded)
    }

    /// Shorthand for a successful reload of `name`.
    pub fn reloaded(module: ResolvedName) -> Self {
        Self::new(module, LoadTrigger::Reload, LoadOutcome::Loaded)
    }

    /// Returns whether hooks should run for this event.
    pub fn is_dispatchable(&self) -> bool {
        self.outcome == LoadOutcome::Loaded && self.module.as_name().is_some()
    }
}
