//! Metrics endpoint configuration.
//!
//! Every field falls back through a metrics-specific environment variable,
//! then a generic one, then a hard default. Explicit values from the config
//! file or `AUTOPATCH__METRICS__*` variables override the chain.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Metrics-specific host variable.
pub const ENV_METRICS_HOST: &str = "LIGHTSTEP_METRICS_HOST";
/// Generic host variable.
pub const ENV_HOST: &str = "LIGHTSTEP_HOST";
/// Metrics-specific port variable.
pub const ENV_METRICS_PORT: &str = "LIGHTSTEP_METRICS_PORT";
/// Generic port variable.
pub const ENV_PORT: &str = "LIGHTSTEP_PORT";
/// Metrics-specific secure flag variable.
pub const ENV_METRICS_SECURE: &str = "LIGHTSTEP_METRICS_SECURE";
/// Generic secure flag variable.
pub const ENV_SECURE: &str = "LIGHTSTEP_SECURE";
/// Access token variable.
pub const ENV_ACCESS_TOKEN: &str = "LIGHTSTEP_ACCESS_TOKEN";

/// Default ingest host.
pub const DEFAULT_HOST: &str = "ingest.lightstep.com";
/// Default ingest port.
pub const DEFAULT_PORT: u16 = 443;
/// Default metrics path.
pub const DEFAULT_PATH: &str = "/metrics";
/// Token used when none is configured; the endpoint rejects it.
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";

/// Where and how runtime metrics are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Ingest host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Ingest port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use `https` when true, `http` otherwise.
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Request path, including the leading slash.
    #[serde(default = "default_path")]
    pub path: String,
    /// Access token sent with every request.
    #[serde(default = "default_token")]
    pub token: String,
}

impl MetricsConfig {
    /// Resolves every field from the environment fallback chain.
    pub fn from_env() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: default_secure(),
            path: default_path(),
            token: default_token(),
        }
    }

    /// Returns the endpoint URL built from scheme, host, port, and path.
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Reads the first set variable in `keys`.
fn env_chain(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| std::env::var(key).ok())
}

/// Interprets a secure flag the way the ingest tooling does: any non-zero
/// integer or `true` enables TLS.
pub fn parse_secure_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n != 0);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_host() -> String {
    env_chain(&[ENV_METRICS_HOST, ENV_HOST]).unwrap_or_else(|| DEFAULT_HOST.to_string())
}

fn default_port() -> u16 {
    match env_chain(&[ENV_METRICS_PORT, ENV_PORT]) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = %raw, "Invalid metrics port, using default");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

fn default_secure() -> bool {
    match env_chain(&[ENV_METRICS_SECURE, ENV_SECURE]) {
        Some(raw) => parse_secure_flag(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "Invalid metrics secure flag, using default");
            true
        }),
        None => true,
    }
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_token() -> String {
    std::env::var(ENV_ACCESS_TOKEN).unwrap_or_else(|_| INVALID_TOKEN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 7] = [
        ENV_METRICS_HOST,
        ENV_HOST,
        ENV_METRICS_PORT,
        ENV_PORT,
        ENV_METRICS_SECURE,
        ENV_SECURE,
        ENV_ACCESS_TOKEN,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn test_hard_defaults() {
        clear_env();
        let config = MetricsConfig::from_env();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 443);
        assert!(config.secure);
        assert_eq!(config.path, "/metrics");
        assert_eq!(config.token, INVALID_TOKEN);
        assert_eq!(config.endpoint(), "https://ingest.lightstep.com:443/metrics");
    }

    #[test]
    #[serial]
    fn test_generic_variables_apply() {
        clear_env();
        set_env(ENV_HOST, "collector.internal");
        set_env(ENV_PORT, "8080");
        set_env(ENV_SECURE, "0");

        let config = MetricsConfig::from_env();
        assert_eq!(config.endpoint(), "http://collector.internal:8080/metrics");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_metrics_specific_variables_win() {
        clear_env();
        set_env(ENV_HOST, "generic.internal");
        set_env(ENV_METRICS_HOST, "metrics.internal");
        set_env(ENV_PORT, "1");
        set_env(ENV_METRICS_PORT, "9443");
        set_env(ENV_ACCESS_TOKEN, "secret");

        let config = MetricsConfig::from_env();
        assert_eq!(config.host, "metrics.internal");
        assert_eq!(config.port, 9443);
        assert_eq!(config.token, "secret");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back() {
        clear_env();
        set_env(ENV_METRICS_PORT, "not-a-port");
        assert_eq!(MetricsConfig::from_env().port, DEFAULT_PORT);
        clear_env();
    }

    #[test]
    fn test_parse_secure_flag() {
        assert_eq!(parse_secure_flag("1"), Some(true));
        assert_eq!(parse_secure_flag("0"), Some(false));
        assert_eq!(parse_secure_flag("2"), Some(true));
        assert_eq!(parse_secure_flag("True"), Some(true));
        assert_eq!(parse_secure_flag("off"), Some(false));
        assert_eq!(parse_secure_flag("maybe"), None);
    }
}
