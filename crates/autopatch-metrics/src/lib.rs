//! # autopatch-metrics
//!
//! Delivery client for runtime metrics. Payloads are already encoded by the
//! caller; this crate only posts them, with the access token header and
//! retries on transport failures.

pub mod error;
pub mod reporter;
pub mod retry;

pub use error::MetricsError;
pub use reporter::MetricsReporter;
pub use retry::RetryPolicy;
