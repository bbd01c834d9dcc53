//! Metrics delivery errors.

use thiserror::Error;

use autopatch_core::AgentError;

/// Failure to deliver a metrics payload.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The access token is not a valid header value.
    #[error("access token contains characters not allowed in a header")]
    InvalidToken,

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Endpoint the request was sent to.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

impl MetricsError {
    /// Returns whether retrying the request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => !source.is_builder(),
            Self::Client(_) | Self::InvalidToken => false,
        }
    }
}

impl From<MetricsError> for AgentError {
    fn from(err: MetricsError) -> Self {
        AgentError::with_source(
            autopatch_core::ErrorKind::ExternalService,
            "metrics delivery failed",
            err,
        )
    }
}
