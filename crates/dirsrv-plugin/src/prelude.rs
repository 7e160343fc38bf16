//! Prelude for convenient imports when writing hooks.

pub use async_trait::async_trait;

pub use dirsrv_core::config::plugin::PluginEntryConfig;
pub use dirsrv_core::types::{
    ClientConnectionInfo, DisconnectReason, Entry, IntermediateResponse, LdifExportConfig,
    LdifImportConfig, Modification, OperationKey, PluginOperation, ResultCode,
};

pub use crate::factory::HookFactory;
pub use crate::hooks::category::{HookCategory, HookCategorySet};
pub use crate::hooks::definitions::{HaltResult, HookAction, HookArgs, HookError, HookResult};
pub use crate::traits::{ClosureHook, DirectoryHook};
