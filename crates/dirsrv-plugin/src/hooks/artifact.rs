//! Output artifacts carried from hook to hook within one dispatch.
//!
//! A `search-result-entry` hook sees the entry as filtered by the hooks
//! before it and outputs its own filtered entry. A `subordinate-modify-dn`
//! hook sees every modification collected so far and outputs the ones it
//! adds. Outputs of all other categories are merged: objects key by key,
//! arrays by concatenation, and two values under the same key are
//! collected into an array.

use serde_json::Value;

use dirsrv_core::types::{Entry, Modification};

use super::definitions::HookArgs;

/// Running artifact of one dispatch.
#[derive(Debug, Default)]
pub(crate) struct DispatchArtifact {
    /// Aggregated output returned to the caller.
    output: Option<Value>,
    /// Latest filtered search result entry.
    entry: Option<Entry>,
    /// Caller's modifications followed by those added by hooks.
    modifications: Option<Vec<Modification>>,
}

impl DispatchArtifact {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the arguments the next hook is invoked with.
    pub(crate) fn thread<'a>(&'a self, args: HookArgs<'a>) -> HookArgs<'a> {
        match args {
            HookArgs::SearchResultEntry { operation, entry } => HookArgs::SearchResultEntry {
                operation,
                entry: self.entry.as_ref().unwrap_or(entry),
            },
            HookArgs::SubordinateModifyDn {
                operation,
                old_entry,
                new_entry,
                modifications,
            } => HookArgs::SubordinateModifyDn {
                operation,
                old_entry,
                new_entry,
                modifications: self.modifications.as_deref().unwrap_or(modifications),
            },
            other => other,
        }
    }

    /// Folds one hook's output into the artifact.
    ///
    /// Fails when a typed output does not have the expected shape.
    pub(crate) fn absorb(&mut self, args: &HookArgs<'_>, value: Value) -> serde_json::Result<()> {
        if value.is_null() {
            return Ok(());
        }

        match args {
            HookArgs::SearchResultEntry { .. } => {
                self.entry = Some(serde_json::from_value(value.clone())?);
                self.output = Some(value);
            }
            HookArgs::SubordinateModifyDn { modifications, .. } => {
                let added: Vec<Modification> = serde_json::from_value(value)?;
                let running = self
                    .modifications
                    .get_or_insert_with(|| modifications.to_vec());
                running.extend(added);
                self.output = Some(serde_json::to_value(&running[modifications.len()..])?);
            }
            _ => {
                self.output = Some(match self.output.take() {
                    Some(current) => merge(current, value),
                    None => value,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn into_output(self) -> Option<Value> {
        self.output
    }
}

/// Merges `next` into `current` without dropping either side.
fn merge(current: Value, next: Value) -> Value {
    match (current, next) {
        (Value::Object(mut into), Value::Object(from)) => {
            for (key, value) in from {
                let merged = match into.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                into.insert(key, merged);
            }
            Value::Object(into)
        }
        (Value::Array(mut into), Value::Array(from)) => {
            into.extend(from);
            Value::Array(into)
        }
        (Value::Array(mut into), other) => {
            into.push(other);
            Value::Array(into)
        }
        (other, Value::Array(from)) => {
            let mut values = vec![other];
            values.extend(from);
            Value::Array(values)
        }
        (current, next) => Value::Array(vec![current, next]),
    }
}
