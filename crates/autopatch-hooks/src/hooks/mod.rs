//! Hook system: registry, dispatcher, and load event definitions.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{LoadEvent, LoadOutcome, LoadTrigger, ResolvedName};
pub use dispatcher::{DispatchReport, HookDispatcher};
pub use registry::HookRegistry;
