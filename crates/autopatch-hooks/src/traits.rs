//! Hook callback traits.

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a hook callback.
#[derive(Debug, Error)]
pub enum HookFailure {
    /// The callback returned an error.
    #[error("{0}")]
    Failed(#[from] anyhow::Error),
    /// The callback panicked.
    #[error("hook panicked: {0}")]
    Panicked(String),
}

/// A callback run when its module is loaded or reloaded.
///
/// Hooks take no arguments: they capture whatever they need to patch.
/// Reloads call a hook again, so implementations must tolerate repeated
/// calls.
pub trait HookHandler: Send + Sync + std::fmt::Debug {
    /// Runs the hook.
    fn call(&self) -> Result<(), HookFailure>;

    /// Returns a label identifying who registered this hook, for logs.
    fn owner(&self) -> &str {
        "anonymous"
    }
}

/// A closure-based hook.
pub struct ClosureHook {
    /// Owner label.
    owner: String,
    /// Hook function.
    callback: Arc<dyn Fn() -> Result<(), HookFailure> + Send + Sync>,
}

impl std::fmt::Debug for ClosureHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHook")
            .field("owner", &self.owner)
            .field("callback", &"<closure>")
            .finish()
    }
}

impl ClosureHook {
    /// Creates a hook from a fallible closure.
    pub fn new<F, E>(owner: &str, callback: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self {
            owner: owner.to_string(),
            callback: Arc::new(move || callback().map_err(|e| HookFailure::Failed(e.into()))),
        }
    }

    /// Creates a hook from an infallible closure.
    pub fn infallible<F>(owner: &str, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            owner: owner.to_string(),
            callback: Arc::new(move || {
                callback();
                Ok(())
            }),
        }
    }

    /// Wraps the hook into an `Arc<dyn HookHandler>`.
    pub fn into_handler(self) -> Arc<dyn HookHandler> {
        Arc::new(self)
    }
}

impl HookHandler for ClosureHook {
    fn call(&self) -> Result<(), HookFailure> {
        (self.callback)()
    }

    fn owner(&self) -> &str {
        &self.owner
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
