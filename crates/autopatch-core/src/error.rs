//! Unified agent error type for autopatch.
//!
//! Every failure that originates inside the agent (name resolution,
//! patching, configuration, metrics delivery) is expressed as
//! an [`AgentError`]. Boundary operations turn these into debug logs so the
//! host application never sees them.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A module name could not be derived from a load or reload event.
    Resolution,
    /// Installing or removing the interception layer failed.
    Patch,
    /// A runtime entry point required by the chosen strategy is missing.
    MissingEntryPoint,
    /// A configuration error occurred.
    Configuration,
    /// An external service (metrics endpoint) error occurred.
    ExternalService,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution => write!(f, "RESOLUTION"),
            Self::Patch => write!(f, "PATCH"),
            Self::MissingEntryPoint => write!(f, "MISSING_ENTRY_POINT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the agent.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AgentError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AgentError {
    /// Create a new agent error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new agent error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a name-resolution error.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    /// Create a patch error.
    pub fn patch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Patch, message)
    }

    /// Create a missing-entry-point error.
    pub fn missing_entry_point(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingEntryPoint, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AgentError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}
