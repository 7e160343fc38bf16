//! Bulk import/export job descriptors for LDIF hooks.

use serde::{Deserialize, Serialize};

/// Settings of an LDIF import job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdifImportConfig {
    /// Source file path.
    pub path: String,
    /// Backend being imported into.
    pub backend_id: String,
    /// Whether entries are appended to existing content.
    pub append: bool,
}

/// Settings of an LDIF export job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdifExportConfig {
    /// Destination file path.
    pub path: String,
    /// Backend being exported.
    pub backend_id: String,
}
