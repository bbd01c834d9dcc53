//! # autopatch-core
//!
//! Shared foundation for the autopatch agent: configuration schemas,
//! tracing setup, and the unified error type.
//!
//! This crate has **no** internal dependencies on other autopatch crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use error::{AgentError, ErrorKind};
pub use result::AgentResult;
