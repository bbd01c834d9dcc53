//! Convenience result type alias for the agent.

use crate::error::AgentError;

/// A specialized `Result` type for agent-internal operations.
pub type AgentResult<T> = Result<T, AgentError>;
