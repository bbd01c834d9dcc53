//! Errors raised by the module runtime itself.
//!
//! These belong to the host: interception wrappers hand them back to the
//! caller unchanged.

use thiserror::Error;

/// Failure of a load or reload performed by the runtime.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No source provides a module with this name.
    #[error("No module named '{name}'")]
    NotFound {
        /// The requested name.
        name: String,
    },

    /// The module body failed while executing.
    #[error("Module '{name}' failed to execute: {source}")]
    Execution {
        /// The module name.
        name: String,
        /// The body's error.
        #[source]
        source: anyhow::Error,
    },

    /// A reload was requested for a module that is not loaded.
    #[error("Module '{name}' is not loaded")]
    NotLoaded {
        /// The module name.
        name: String,
    },

    /// The runtime has no function installed for an entry point.
    #[error("Runtime has no '{entry}' entry point")]
    MissingEntryPoint {
        /// The entry point name.
        entry: &'static str,
    },
}

impl LoadError {
    /// Returns the module name the error concerns, if any.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            Self::NotFound { name } | Self::Execution { name, .. } | Self::NotLoaded { name } => {
                Some(name)
            }
            Self::MissingEntryPoint { .. } => None,
        }
    }
}
