//! Minimal directory entry and modification shapes passed to hooks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A directory entry: a DN plus attribute values.
///
/// Attribute names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Distinguished name.
    pub dn: String,
    /// Attribute name → values.
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Creates an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds a value to an attribute.
    pub fn with_value(mut self, attribute: &str, value: &str) -> Self {
        self.attributes
            .entry(attribute.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Returns the values of an attribute.
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(&attribute.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Kind of change applied by a [`Modification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Add,
    Delete,
    Replace,
    Increment,
}

/// A single attribute modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Kind of change.
    pub modification_type: ModificationType,
    /// Attribute name.
    pub attribute: String,
    /// Values involved.
    pub values: Vec<String>,
}
