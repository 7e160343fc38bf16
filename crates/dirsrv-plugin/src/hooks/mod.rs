//! Hook system: categories, ordering, registry, skip tracking, and the
//! dispatcher that ties them together.

mod artifact;
pub mod category;
pub mod definitions;
pub mod dispatcher;
pub mod order;
pub mod registry;
pub mod skip;

pub use category::{CategoryFamily, DispatchMode, HookCategory, HookCategorySet};
pub use definitions::{DispatchOutcome, HaltResult, HookAction, HookArgs, HookError, HookResult};
pub use dispatcher::{DispatcherSettings, HookDispatcher};
pub use order::{OrderDiagnostic, OrderSpec};
pub use registry::{HookId, HookRegistry, RegisteredHook};
pub use skip::SkipTracker;
