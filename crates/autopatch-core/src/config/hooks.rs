//! Import hook configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which interception variant to install.
///
/// `Auto` picks the variant from the runtime version at install time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterceptionMode {
    /// Select from the runtime version.
    #[default]
    Auto,
    /// Force the find-and-load + reload variant.
    Modern,
    /// Force the import + reload variant.
    Legacy,
}

impl fmt::Display for InterceptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Modern => write!(f, "modern"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Import hook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Whether to install the interception layer during bootstrap.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interception variant override.
    #[serde(default)]
    pub mode: InterceptionMode,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: InterceptionMode::Auto,
        }
    }
}

fn default_true() -> bool {
    true
}
