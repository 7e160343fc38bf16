//! Plugin pipeline configuration.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::result_code::ResultCode;

/// Plugin pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Result code used when a hook fails or violates its contract.
    #[serde(default = "default_server_error_result_code")]
    pub server_error_result_code: ResultCode,
    /// Upper bound on a single hook invocation. Unset means no limit.
    #[serde(default)]
    pub hook_timeout_seconds: Option<u64>,
    /// Ordering expression per category name, e.g.
    /// `pre-operation-add = "uid-unique, *, audit"`.
    #[serde(default)]
    pub order: BTreeMap<String, String>,
    /// Configured plugin entries.
    #[serde(default)]
    pub entries: Vec<PluginEntryConfig>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            server_error_result_code: default_server_error_result_code(),
            hook_timeout_seconds: None,
            order: BTreeMap::new(),
            entries: Vec::new(),
        }
    }
}

/// One plugin configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntryConfig {
    /// Configuration location of the plugin, normally a DN such as
    /// `cn=Audit,cn=Plugins,cn=config`. Unique across all entries.
    pub id: String,
    /// Name of the hook factory that builds this plugin.
    pub kind: String,
    /// Whether the plugin should be registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Category names the plugin is invoked for.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Whether the plugin is invoked for internal operations.
    #[serde(default = "default_true")]
    pub invoke_for_internal_operations: bool,
    /// Plugin-specific settings, passed through to the factory.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl PluginEntryConfig {
    /// Creates an enabled entry with no categories or settings.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            enabled: true,
            categories: Vec::new(),
            invoke_for_internal_operations: true,
            settings: HashMap::new(),
        }
    }

    /// Adds a category name.
    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }

    /// Sets the internal-operation flag.
    pub fn with_internal_operations(mut self, invoke: bool) -> Self {
        self.invoke_for_internal_operations = invoke;
        self
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Gets a string setting.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

fn default_server_error_result_code() -> ResultCode {
    ResultCode::Other
}

fn default_true() -> bool {
    true
}
