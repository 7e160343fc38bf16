//! Hook argument shapes, hook results, and dispatch outcomes.

use serde::{Deserialize, Serialize};

use dirsrv_core::error::AppError;
use dirsrv_core::types::{
    ClientConnectionInfo, DisconnectReason, Entry, IntermediateResponse, LdifExportConfig,
    LdifImportConfig, Modification, PluginOperation, ResultCode,
};

use super::category::{CategoryFamily, HookCategory};

/// Details of a veto: what the client will be told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltResult {
    /// Result code for the operation.
    pub result_code: ResultCode,
    /// Diagnostic message for the operation.
    pub message: String,
    /// Matched DN, for name-resolution failures.
    pub matched_dn: Option<String>,
    /// Referral URLs, when the veto is a referral.
    pub referral_urls: Vec<String>,
}

impl HaltResult {
    /// Creates a halt with a result code and message.
    pub fn new(result_code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            result_code,
            message: message.into(),
            matched_dn: None,
            referral_urls: Vec::new(),
        }
    }

    /// Sets the matched DN.
    pub fn with_matched_dn(mut self, dn: impl Into<String>) -> Self {
        self.matched_dn = Some(dn.into());
        self
    }

    /// Sets the referral URLs.
    pub fn with_referrals(mut self, urls: Vec<String>) -> Self {
        self.referral_urls = urls;
        self
    }
}

/// Action returned by a hook telling the dispatcher what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HookAction {
    /// Continue to the next hook, optionally publishing an output artifact.
    Continue(Option<serde_json::Value>),
    /// Let the operation proceed but invoke no further hooks in this
    /// category for this dispatch.
    SkipRemaining(Option<serde_json::Value>),
    /// Veto: stop the operation with the given result.
    Halt(HaltResult),
}

impl HookAction {
    /// Plain continue without output.
    pub fn proceed() -> Self {
        Self::Continue(None)
    }

    /// Halt with a result code and message.
    pub fn halt(result_code: ResultCode, message: impl Into<String>) -> Self {
        Self::Halt(HaltResult::new(result_code, message))
    }
}

/// Errors a hook can report instead of an action.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook failed while processing.
    #[error("hook failed: {0}")]
    Failed(String),
    /// The hook was asked to serve a category it does not implement.
    #[error("hook does not support category '{0}'")]
    Unsupported(HookCategory),
    /// The hook's configuration is unusable.
    #[error("invalid hook configuration: {0}")]
    Configuration(String),
    /// An application error surfaced through the hook.
    #[error(transparent)]
    Internal(#[from] AppError),
}

/// Result returned from a hook invocation.
pub type HookResult = Result<HookAction, HookError>;

/// Aggregated result of dispatching one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    /// Processing may continue. `output` folds the outputs of every hook
    /// that supplied one.
    Continue {
        /// Output artifact, if any hook produced one.
        output: Option<serde_json::Value>,
    },
    /// Processing must stop with the given result.
    Halt(HaltResult),
}

impl DispatchOutcome {
    /// Continue without output.
    pub fn proceed() -> Self {
        Self::Continue { output: None }
    }

    /// Returns whether processing may continue.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }

    /// Returns whether processing must stop.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }

    /// Returns the halt details, if halted.
    pub fn halt_result(&self) -> Option<&HaltResult> {
        match self {
            Self::Halt(h) => Some(h),
            Self::Continue { .. } => None,
        }
    }

    /// Converts into a `Result`, with the halt as the error side.
    pub fn into_result(self) -> Result<Option<serde_json::Value>, HaltResult> {
        match self {
            Self::Continue { output } => Ok(output),
            Self::Halt(h) => Err(h),
        }
    }
}

/// Arguments of one dispatch, shaped per category family.
#[derive(Debug, Clone, Copy)]
pub enum HookArgs<'a> {
    /// `startup`.
    Startup,
    /// `shutdown`.
    Shutdown {
        /// Why the server is stopping.
        reason: &'a str,
    },
    /// `post-connect`.
    PostConnect {
        /// The new connection.
        connection: &'a ClientConnectionInfo,
    },
    /// `post-disconnect`.
    PostDisconnect {
        /// The closed connection.
        connection: &'a ClientConnectionInfo,
        /// Why it was closed.
        reason: DisconnectReason,
        /// Optional explanation.
        message: Option<&'a str>,
    },
    /// `ldif-import-begin` and `ldif-import-end`.
    LdifImportJob {
        /// The import job.
        config: &'a LdifImportConfig,
    },
    /// `ldif-import`.
    LdifImport {
        /// The import job.
        config: &'a LdifImportConfig,
        /// The entry being imported.
        entry: &'a Entry,
    },
    /// `ldif-export`.
    LdifExport {
        /// The export job.
        config: &'a LdifExportConfig,
        /// The entry being exported.
        entry: &'a Entry,
    },
    /// pre-parse, pre-operation, post-operation, post-response and
    /// post-synchronization categories.
    Operation {
        /// The operation.
        operation: &'a dyn PluginOperation,
    },
    /// `search-result-entry`.
    SearchResultEntry {
        /// The search operation.
        operation: &'a dyn PluginOperation,
        /// The entry about to be returned, as filtered by earlier hooks.
        entry: &'a Entry,
    },
    /// `search-result-reference`.
    SearchResultReference {
        /// The search operation.
        operation: &'a dyn PluginOperation,
        /// The referral URLs about to be returned.
        referral_urls: &'a [String],
    },
    /// `intermediate-response`.
    IntermediateResponse {
        /// The operation the response belongs to.
        operation: &'a dyn PluginOperation,
        /// The response about to be returned.
        response: &'a IntermediateResponse,
    },
    /// `subordinate-modify-dn`.
    SubordinateModifyDn {
        /// The modify DN operation.
        operation: &'a dyn PluginOperation,
        /// The subordinate entry before the rename.
        old_entry: &'a Entry,
        /// The subordinate entry after the rename.
        new_entry: &'a Entry,
        /// Additional modifications to apply to the renamed entry, including
        /// those added by earlier hooks.
        modifications: &'a [Modification],
    },
    /// `subordinate-delete`.
    SubordinateDelete {
        /// The subtree delete operation.
        operation: &'a dyn PluginOperation,
        /// The subordinate entry being removed.
        entry: &'a Entry,
    },
}

impl<'a> HookArgs<'a> {
    /// Returns the operation these arguments belong to, if any.
    pub fn operation(&self) -> Option<&'a dyn PluginOperation> {
        match *self {
            Self::Operation { operation }
            | Self::SearchResultEntry { operation, .. }
            | Self::SearchResultReference { operation, .. }
            | Self::IntermediateResponse { operation, .. }
            | Self::SubordinateModifyDn { operation, .. }
            | Self::SubordinateDelete { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Returns the variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown { .. } => "shutdown",
            Self::PostConnect { .. } => "post-connect",
            Self::PostDisconnect { .. } => "post-disconnect",
            Self::LdifImportJob { .. } => "ldif-import-job",
            Self::LdifImport { .. } => "ldif-import",
            Self::LdifExport { .. } => "ldif-export",
            Self::Operation { .. } => "operation",
            Self::SearchResultEntry { .. } => "search-result-entry",
            Self::SearchResultReference { .. } => "search-result-reference",
            Self::IntermediateResponse { .. } => "intermediate-response",
            Self::SubordinateModifyDn { .. } => "subordinate-modify-dn",
            Self::SubordinateDelete { .. } => "subordinate-delete",
        }
    }

    /// Returns whether these arguments have the shape `category` expects.
    pub fn accepts(&self, category: HookCategory) -> bool {
        use HookCategory as C;

        match (category.family(), self) {
            (CategoryFamily::PreParse, Self::Operation { .. })
            | (CategoryFamily::PreOperation, Self::Operation { .. })
            | (CategoryFamily::PostOperation, Self::Operation { .. })
            | (CategoryFamily::PostResponse, Self::Operation { .. })
            | (CategoryFamily::PostSynchronization, Self::Operation { .. }) => true,
            _ => matches!(
                (category, self),
                (C::Startup, Self::Startup)
                    | (C::Shutdown, Self::Shutdown { .. })
                    | (C::PostConnect, Self::PostConnect { .. })
                    | (C::PostDisconnect, Self::PostDisconnect { .. })
                    | (C::LdifImportBegin, Self::LdifImportJob { .. })
                    | (C::LdifImportEnd, Self::LdifImportJob { .. })
                    | (C::LdifImport, Self::LdifImport { .. })
                    | (C::LdifExport, Self::LdifExport { .. })
                    | (C::SearchResultEntry, Self::SearchResultEntry { .. })
                    | (C::SearchResultReference, Self::SearchResultReference { .. })
                    | (C::IntermediateResponse, Self::IntermediateResponse { .. })
                    | (C::SubordinateModifyDn, Self::SubordinateModifyDn { .. })
                    | (C::SubordinateDelete, Self::SubordinateDelete { .. })
            ),
        }
    }
}
