//! Shared directory types consumed by the plugin pipeline.

pub mod connection;
pub mod entry;
pub mod id;
pub mod ldif;
pub mod operation;
pub mod result_code;

pub use connection::{ClientConnectionInfo, DisconnectReason};
pub use entry::{Entry, Modification, ModificationType};
pub use id::OperationKey;
pub use ldif::{LdifExportConfig, LdifImportConfig};
pub use operation::{IntermediateResponse, OperationInfo, OperationType, PluginOperation};
pub use result_code::ResultCode;
