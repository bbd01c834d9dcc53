//! Agent configuration schemas.
//!
//! The agent is configured from an optional TOML file and from environment
//! variables prefixed with `AUTOPATCH` (nested keys separated by `__`).
//! Every field has a default so that an empty environment is valid: the
//! agent must never stop the host from starting because of configuration.

pub mod hooks;
pub mod logging;
pub mod metrics;

use serde::{Deserialize, Serialize};

use self::hooks::HooksConfig;
use self::logging::LoggingConfig;
use self::metrics::MetricsConfig;

use crate::error::AgentError;

/// Default configuration file, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config/autopatch";

/// Variable that points at an alternative configuration file.
pub const CONFIG_FILE_ENV: &str = "AUTOPATCH_CONFIG";

/// Root agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Import hook settings.
    #[serde(default)]
    pub hooks: HooksConfig,
    /// Metrics delivery settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AgentConfig {
    /// Loads configuration from `path` (extension optional, file optional)
    /// merged with `AUTOPATCH__*` environment variables.
    pub fn load(path: &str) -> Result<Self, AgentError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("AUTOPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AgentError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AgentError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Loads configuration from `$AUTOPATCH_CONFIG` or the default file.
    pub fn from_env() -> Result<Self, AgentError> {
        let path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(&path)
    }
}
