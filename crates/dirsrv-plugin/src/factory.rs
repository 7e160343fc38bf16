//! Hook factories build hooks from configuration entries.
//!
//! A configuration entry names a `kind`; the factory registered under that
//! kind validates the entry and constructs the hook.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use dirsrv_core::config::plugin::PluginEntryConfig;
use dirsrv_core::error::AppError;
use dirsrv_core::result::AppResult;

use crate::hooks::definitions::HookError;
use crate::traits::DirectoryHook;

/// Builds hooks of one kind.
#[async_trait]
pub trait HookFactory: Send + Sync + fmt::Debug {
    /// The kind name configuration entries refer to.
    fn kind(&self) -> &str;

    /// Checks whether an entry is acceptable, returning the reasons if not.
    fn validate(&self, _entry: &PluginEntryConfig) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Creates a hook for an entry.
    async fn create(&self, entry: &PluginEntryConfig) -> Result<Arc<dyn DirectoryHook>, HookError>;
}

/// Registry of hook factories keyed by kind.
#[derive(Debug)]
pub struct HookFactoryRegistry {
    /// Lower-cased kind → factory.
    factories: RwLock<HashMap<String, Arc<dyn HookFactory>>>,
}

impl HookFactoryRegistry {
    /// Creates a new empty factory registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a factory.
    pub async fn register(&self, factory: Arc<dyn HookFactory>) -> AppResult<()> {
        let kind = factory.kind().to_lowercase();
        let mut factories = self.factories.write().await;

        if factories.contains_key(&kind) {
            return Err(AppError::conflict(format!(
                "Hook factory '{}' is already registered",
                kind
            )));
        }

        info!(kind = %kind, "Hook factory registered");
        factories.insert(kind, factory);
        Ok(())
    }

    /// Gets a factory by kind.
    pub async fn get(&self, kind: &str) -> Option<Arc<dyn HookFactory>> {
        let factories = self.factories.read().await;
        factories.get(&kind.to_lowercase()).cloned()
    }

    /// Resolves the factory for an entry.
    pub async fn resolve(&self, entry: &PluginEntryConfig) -> AppResult<Arc<dyn HookFactory>> {
        self.get(&entry.kind).await.ok_or_else(|| {
            AppError::configuration(format!(
                "Plugin '{}' names unknown kind '{}'",
                entry.id, entry.kind
            ))
        })
    }

    /// Lists registered kinds, sorted.
    pub async fn kinds(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut kinds: Vec<String> = factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Returns factory count.
    pub async fn count(&self) -> usize {
        self.factories.read().await.len()
    }
}

impl Default for HookFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
