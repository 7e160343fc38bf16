//! # dirsrv-plugin
//!
//! Extension-point pipeline for the directory server. Provides:
//!
//! - Extension categories covering lifecycle, connection, bulk data and
//!   per-operation processing phases
//! - Ordering expressions with a wildcard for unnamed hooks
//! - A copy-on-write hook registry that can change while operations are
//!   being dispatched
//! - Pre/post-operation pairing through per-operation skip records
//! - A dispatcher with gating and observational halt semantics
//! - A configuration-driven plugin manager and hook factories

pub mod factory;
pub mod hooks;
pub mod manager;
pub mod prelude;
pub mod traits;

pub use factory::{HookFactory, HookFactoryRegistry};
pub use hooks::definitions::{DispatchOutcome, HaltResult, HookAction, HookArgs, HookResult};
pub use hooks::dispatcher::HookDispatcher;
pub use hooks::registry::{HookId, HookRegistry};
pub use manager::{ConfigChangeResult, PluginManager};
pub use traits::DirectoryHook;
