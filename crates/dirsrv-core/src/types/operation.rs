//! The operation contract seen by extension hooks.
//!
//! Request processing owns the concrete operation objects. Hooks and the
//! dispatcher only see them through [`PluginOperation`], which exposes an
//! opaque identity, the internal-operation flag, and a few accessors used
//! for diagnostics and outcome inspection.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::OperationKey;
use super::result_code::ResultCode;

/// LDAP operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Abandon,
    Add,
    Bind,
    Compare,
    Delete,
    Extended,
    Modify,
    ModifyDn,
    Search,
    Unbind,
}

impl OperationType {
    /// Returns the operation name used in log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abandon => "abandon",
            Self::Add => "add",
            Self::Bind => "bind",
            Self::Compare => "compare",
            Self::Delete => "delete",
            Self::Extended => "extended",
            Self::Modify => "modify",
            Self::ModifyDn => "modify-dn",
            Self::Search => "search",
            Self::Unbind => "unbind",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only view of an in-flight operation handed to hooks.
pub trait PluginOperation: Send + Sync + fmt::Debug {
    /// Stable identity of this operation for its whole lifetime.
    fn key(&self) -> OperationKey;

    /// The LDAP operation type.
    fn operation_type(&self) -> OperationType;

    /// Identifier of the client connection, `-1` for internal operations.
    fn connection_id(&self) -> i64;

    /// Per-connection operation identifier.
    fn operation_id(&self) -> i64;

    /// Whether the operation was issued by the server itself.
    fn is_internal(&self) -> bool;

    /// Result code recorded so far, if any.
    fn result_code(&self) -> Option<ResultCode> {
        None
    }

    /// Diagnostic message recorded so far, if any.
    fn diagnostic_message(&self) -> Option<String> {
        None
    }

    /// Access to the concrete operation for hooks that know its type.
    fn as_any(&self) -> &dyn Any;
}

/// Plain-data operation descriptor.
///
/// Used by request processing for operations that carry no richer state,
/// and by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// Operation identity.
    pub key: OperationKey,
    /// Operation type.
    pub operation_type: OperationType,
    /// Connection identifier.
    pub connection_id: i64,
    /// Operation identifier.
    pub operation_id: i64,
    /// Internal-operation flag.
    pub internal: bool,
    /// Result code, once known.
    pub result_code: Option<ResultCode>,
    /// Diagnostic message, once known.
    pub diagnostic_message: Option<String>,
}

impl OperationInfo {
    /// Creates a new external operation with a fresh key.
    pub fn new(operation_type: OperationType, connection_id: i64, operation_id: i64) -> Self {
        Self {
            key: OperationKey::new(),
            operation_type,
            connection_id,
            operation_id,
            internal: false,
            result_code: None,
            diagnostic_message: None,
        }
    }

    /// Creates a new internal operation with a fresh key.
    pub fn internal(operation_type: OperationType, operation_id: i64) -> Self {
        Self {
            internal: true,
            ..Self::new(operation_type, -1, operation_id)
        }
    }

    /// Records the final result of the operation.
    pub fn with_result(mut self, result_code: ResultCode, message: Option<&str>) -> Self {
        self.result_code = Some(result_code);
        self.diagnostic_message = message.map(str::to_string);
        self
    }
}

impl PluginOperation for OperationInfo {
    fn key(&self) -> OperationKey {
        self.key
    }

    fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    fn connection_id(&self) -> i64 {
        self.connection_id
    }

    fn operation_id(&self) -> i64 {
        self.operation_id
    }

    fn is_internal(&self) -> bool {
        self.internal
    }

    fn result_code(&self) -> Option<ResultCode> {
        self.result_code
    }

    fn diagnostic_message(&self) -> Option<String> {
        self.diagnostic_message.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An intermediate response about to be sent for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateResponse {
    /// Response name (an OID), if any.
    pub oid: Option<String>,
    /// Encoded response value, if any.
    pub value: Option<Vec<u8>>,
}
