//! Extension categories: every point in request and lifecycle processing at
//! which hooks can be invoked.
//!
//! Each category has its own ordered hook list and its own ordering string.
//! The family of a category decides how the dispatcher treats a halt:
//! gating categories stop at the first veto, observational categories keep
//! notifying every hook.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use dirsrv_core::types::OperationType;

/// Set of categories a hook is registered for or able to serve.
pub type HookCategorySet = BTreeSet<HookCategory>;

macro_rules! hook_categories {
    (@op $op:ident) => { Some(OperationType::$op) };
    (@op) => { None };
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $name:literal, $family:ident $(, $op:ident)?;
        )+
    ) => {
        /// Enumeration of all extension categories.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum HookCategory {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HookCategory {
            /// Every category, in declaration order.
            pub const ALL: &'static [HookCategory] = &[$(HookCategory::$variant,)+];

            /// Returns the configuration name of this category.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Returns the family this category belongs to.
            pub fn family(&self) -> CategoryFamily {
                match self {
                    $(Self::$variant => CategoryFamily::$family,)+
                }
            }

            /// Returns the LDAP operation type for per-operation categories.
            pub fn operation_type(&self) -> Option<OperationType> {
                match self {
                    $(Self::$variant => hook_categories!(@op $($op)?),)+
                }
            }
        }
    };
}

hook_categories! {
    // ── Lifecycle ──
    /// Server startup. Any non-continue outcome aborts startup.
    Startup => "startup", Lifecycle;
    /// Server shutdown.
    Shutdown => "shutdown", Lifecycle;

    // ── Connection ──
    /// A client connection was accepted.
    PostConnect => "post-connect", Connection;
    /// A client connection was closed.
    PostDisconnect => "post-disconnect", Connection;

    // ── Bulk data ──
    /// An LDIF import job is starting.
    LdifImportBegin => "ldif-import-begin", BulkData;
    /// One entry is about to be imported.
    LdifImport => "ldif-import", BulkData;
    /// An LDIF import job has finished.
    LdifImportEnd => "ldif-import-end", BulkData;
    /// One entry is about to be exported.
    LdifExport => "ldif-export", BulkData;

    // ── Pre-parse ──
    PreParseAbandon => "pre-parse-abandon", PreParse, Abandon;
    PreParseAdd => "pre-parse-add", PreParse, Add;
    PreParseBind => "pre-parse-bind", PreParse, Bind;
    PreParseCompare => "pre-parse-compare", PreParse, Compare;
    PreParseDelete => "pre-parse-delete", PreParse, Delete;
    PreParseExtended => "pre-parse-extended", PreParse, Extended;
    PreParseModify => "pre-parse-modify", PreParse, Modify;
    PreParseModifyDn => "pre-parse-modify-dn", PreParse, ModifyDn;
    PreParseSearch => "pre-parse-search", PreParse, Search;
    PreParseUnbind => "pre-parse-unbind", PreParse, Unbind;

    // ── Pre-operation ──
    PreOperationAdd => "pre-operation-add", PreOperation, Add;
    PreOperationBind => "pre-operation-bind", PreOperation, Bind;
    PreOperationCompare => "pre-operation-compare", PreOperation, Compare;
    PreOperationDelete => "pre-operation-delete", PreOperation, Delete;
    PreOperationExtended => "pre-operation-extended", PreOperation, Extended;
    PreOperationModify => "pre-operation-modify", PreOperation, Modify;
    PreOperationModifyDn => "pre-operation-modify-dn", PreOperation, ModifyDn;
    PreOperationSearch => "pre-operation-search", PreOperation, Search;

    // ── Post-operation ──
    PostOperationAbandon => "post-operation-abandon", PostOperation, Abandon;
    PostOperationAdd => "post-operation-add", PostOperation, Add;
    PostOperationBind => "post-operation-bind", PostOperation, Bind;
    PostOperationCompare => "post-operation-compare", PostOperation, Compare;
    PostOperationDelete => "post-operation-delete", PostOperation, Delete;
    PostOperationExtended => "post-operation-extended", PostOperation, Extended;
    PostOperationModify => "post-operation-modify", PostOperation, Modify;
    PostOperationModifyDn => "post-operation-modify-dn", PostOperation, ModifyDn;
    PostOperationSearch => "post-operation-search", PostOperation, Search;
    PostOperationUnbind => "post-operation-unbind", PostOperation, Unbind;

    // ── Post-response ──
    PostResponseAdd => "post-response-add", PostResponse, Add;
    PostResponseBind => "post-response-bind", PostResponse, Bind;
    PostResponseCompare => "post-response-compare", PostResponse, Compare;
    PostResponseDelete => "post-response-delete", PostResponse, Delete;
    PostResponseExtended => "post-response-extended", PostResponse, Extended;
    PostResponseModify => "post-response-modify", PostResponse, Modify;
    PostResponseModifyDn => "post-response-modify-dn", PostResponse, ModifyDn;
    PostResponseSearch => "post-response-search", PostResponse, Search;

    // ── Post-synchronization ──
    PostSynchronizationAdd => "post-synchronization-add", PostSynchronization, Add;
    PostSynchronizationDelete => "post-synchronization-delete", PostSynchronization, Delete;
    PostSynchronizationModify => "post-synchronization-modify", PostSynchronization, Modify;
    PostSynchronizationModifyDn => "post-synchronization-modify-dn", PostSynchronization, ModifyDn;

    // ── Result streaming ──
    /// A search result entry is about to be returned.
    SearchResultEntry => "search-result-entry", ResultStreaming, Search;
    /// A search result reference is about to be returned.
    SearchResultReference => "search-result-reference", ResultStreaming, Search;
    /// An intermediate response is about to be returned.
    IntermediateResponse => "intermediate-response", ResultStreaming;

    // ── Structural ──
    /// An entry below the target of a modify DN is being renamed.
    SubordinateModifyDn => "subordinate-modify-dn", Subordinate, ModifyDn;
    /// An entry below the target of a subtree delete is being removed.
    SubordinateDelete => "subordinate-delete", Subordinate, Delete;
}

/// Groups of categories that share argument shapes and halt semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFamily {
    Lifecycle,
    Connection,
    BulkData,
    PreParse,
    PreOperation,
    PostOperation,
    PostResponse,
    PostSynchronization,
    ResultStreaming,
    Subordinate,
}

/// How the dispatcher treats a halting hook in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Stop at the first halt and return it.
    Gating,
    /// Keep invoking every hook; return the last halt seen.
    Observational,
}

impl HookCategory {
    /// Returns the halt semantics of this category.
    pub fn dispatch_mode(&self) -> DispatchMode {
        match self {
            Self::Shutdown | Self::PostDisconnect | Self::LdifImportBegin | Self::LdifImportEnd => {
                DispatchMode::Observational
            }
            _ => match self.family() {
                CategoryFamily::PostOperation
                | CategoryFamily::PostResponse
                | CategoryFamily::PostSynchronization => DispatchMode::Observational,
                _ => DispatchMode::Gating,
            },
        }
    }

    /// Whether a halt in this category records the hooks whose paired
    /// post-operation half must be skipped.
    pub fn records_skips(&self) -> bool {
        self.family() == CategoryFamily::PreOperation
    }

    /// Whether dispatch of this category consumes the skip record of the
    /// operation.
    pub fn honors_skips(&self) -> bool {
        self.family() == CategoryFamily::PostOperation
    }

    /// Whether hooks filtered out by the internal-operation rule are also
    /// recorded as skipped for the paired post-operation pass.
    pub fn records_filtered_internal(&self) -> bool {
        matches!(self, Self::PreOperationExtended)
    }

    /// Returns the post-operation category paired with a pre-operation one.
    pub fn paired_post_operation(&self) -> Option<HookCategory> {
        if !self.records_skips() {
            return None;
        }
        let op = self.operation_type()?;
        Self::for_operation(CategoryFamily::PostOperation, op)
    }

    /// Finds the category of a family for an operation type.
    pub fn for_operation(family: CategoryFamily, op: OperationType) -> Option<HookCategory> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.family() == family && c.operation_type() == Some(op))
    }

    fn compact(name: &str) -> String {
        name.chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect()
    }
}

impl fmt::Display for HookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a category name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown extension category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for HookCategory {
    type Err = UnknownCategory;

    /// Accepts `pre-operation-add`, `pre_operation_add` and the compact
    /// `preoperationadd`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = Self::compact(s.trim());
        Self::ALL
            .iter()
            .copied()
            .find(|c| Self::compact(c.as_str()) == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Parses a list of category names into a set.
pub fn parse_categories<S: AsRef<str>>(names: &[S]) -> Result<HookCategorySet, UnknownCategory> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}
