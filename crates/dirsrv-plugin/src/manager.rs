//! Plugin manager: configuration-driven lifecycle of all hooks.
//!
//! The manager owns the hook registry, the skip tracker and the dispatcher.
//! Request processing receives it (or just its dispatcher) explicitly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use dirsrv_core::config::plugin::{PluginConfig, PluginEntryConfig};
use dirsrv_core::error::{AppError, ErrorKind};
use dirsrv_core::result::AppResult;
use dirsrv_core::types::ResultCode;

use crate::factory::{HookFactory, HookFactoryRegistry};
use crate::hooks::category::{HookCategory, HookCategorySet, parse_categories};
use crate::hooks::dispatcher::{DispatcherSettings, HookDispatcher};
use crate::hooks::order::OrderDiagnostic;
use crate::hooks::registry::{HookId, HookRegistry, RegisteredHook};
use crate::hooks::skip::SkipTracker;
use crate::traits::DirectoryHook;

/// Interval between checks for dispatches still holding a removed hook.
const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long to wait for in-flight dispatches before logging a warning.
const RELEASE_WARN_AFTER: Duration = Duration::from_secs(10);

/// Outcome of applying a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeResult {
    /// Result code of the change.
    pub result_code: ResultCode,
    /// Whether part of the change only takes effect after an administrator
    /// disables and re-enables the plugin.
    pub admin_action_required: bool,
    /// Messages for the administrator.
    pub messages: Vec<String>,
}

impl ConfigChangeResult {
    /// A change applied in full.
    pub fn success() -> Self {
        Self {
            result_code: ResultCode::Success,
            admin_action_required: false,
            messages: Vec::new(),
        }
    }

    /// A change that could not be applied.
    pub fn failure(result_code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            result_code,
            admin_action_required: false,
            messages: vec![message.into()],
        }
    }

    /// Adds a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.result_code.is_success()
    }
}

/// Manages registration, reconfiguration and finalization of hooks.
#[derive(Debug)]
pub struct PluginManager {
    /// Hook registry.
    hook_registry: Arc<HookRegistry>,
    /// Skip tracker.
    skip_tracker: Arc<SkipTracker>,
    /// Hook dispatcher.
    hook_dispatcher: Arc<HookDispatcher>,
    /// Hook factories.
    factories: HookFactoryRegistry,
    /// Configuration of every registered plugin.
    entries: RwLock<HashMap<HookId, PluginEntryConfig>>,
}

impl PluginManager {
    /// Creates a plugin manager and installs the configured orderings.
    ///
    /// Plugin entries are not loaded here; see [`PluginManager::initialize`].
    pub async fn new(config: &PluginConfig) -> Self {
        let hook_registry = Arc::new(HookRegistry::new());
        let skip_tracker = Arc::new(SkipTracker::new());
        let hook_dispatcher = Arc::new(HookDispatcher::new(
            hook_registry.clone(),
            skip_tracker.clone(),
            DispatcherSettings::from(config),
        ));

        for (name, raw) in &config.order {
            match name.parse::<HookCategory>() {
                Ok(category) => {
                    hook_registry.set_order(category, raw).await;
                }
                Err(e) => warn!(category = %name, error = %e, "Ignoring order for unknown category"),
            }
        }

        Self {
            hook_registry,
            skip_tracker,
            hook_dispatcher,
            factories: HookFactoryRegistry::new(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Makes a hook kind available to configuration entries.
    pub async fn register_factory(&self, factory: Arc<dyn HookFactory>) -> AppResult<()> {
        self.factories.register(factory).await
    }

    /// Registers a hook built outside the factory mechanism.
    ///
    /// Every configured category must be one the hook supports.
    pub async fn register_hook(
        &self,
        entry: &PluginEntryConfig,
        hook: Arc<dyn DirectoryHook>,
    ) -> AppResult<Arc<RegisteredHook>> {
        let categories = configured_categories(entry)?;
        let supported = hook.supported_categories();
        let unsupported: Vec<&str> = categories
            .difference(&supported)
            .map(|c| c.as_str())
            .collect();
        if !unsupported.is_empty() {
            return Err(AppError::plugin(format!(
                "Plugin '{}' does not support categories: {}",
                entry.id,
                unsupported.join(", ")
            )));
        }

        let registered = self
            .hook_registry
            .register(RegisteredHook::new(
                entry.id.as_str(),
                entry.kind.as_str(),
                categories,
                entry.invoke_for_internal_operations,
                hook,
            ))
            .await?;

        self.entries
            .write()
            .await
            .insert(registered.id().clone(), entry.clone());

        Ok(registered)
    }

    /// Deregisters a hook and finalizes it.
    ///
    /// Dispatches that started before the removal may still invoke the
    /// hook, so finalization waits until they have finished. Must not be
    /// awaited from inside a dispatch that includes the hook.
    pub async fn deregister_hook(&self, id: &HookId) -> AppResult<()> {
        let hook = self
            .hook_registry
            .deregister(id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Plugin '{}' not found", id)))?;

        self.entries.write().await.remove(id);
        wait_until_released(&hook).await;
        hook.hook().finalize().await;

        info!(hook_id = %id, "Plugin finalized");
        Ok(())
    }

    /// Loads every enabled entry. Entries that fail are logged and skipped.
    ///
    /// Returns the number of plugins registered.
    pub async fn initialize(&self, entries: &[PluginEntryConfig]) -> usize {
        let mut loaded = 0;
        for entry in entries.iter().filter(|e| e.enabled) {
            match self.load_entry(entry).await {
                Ok(_) => loaded += 1,
                Err(e) => {
                    error!(hook_id = %entry.id, kind = %entry.kind, error = %e, "Failed to load plugin");
                }
            }
        }

        info!(loaded = loaded, configured = entries.len(), "Plugins initialized");
        loaded
    }

    async fn load_entry(&self, entry: &PluginEntryConfig) -> AppResult<Arc<RegisteredHook>> {
        configured_categories(entry)?;
        let factory = self.factories.resolve(entry).await?;
        factory
            .validate(entry)
            .map_err(|reasons| AppError::configuration(reasons.join("; ")))?;
        let hook = factory.create(entry).await.map_err(|e| {
            AppError::plugin(format!("Plugin '{}' could not be created: {e}", entry.id))
        })?;
        self.register_hook(entry, hook).await
    }

    /// Checks whether a new plugin entry could be added.
    pub async fn is_configuration_add_acceptable(
        &self,
        entry: &PluginEntryConfig,
    ) -> Result<(), Vec<String>> {
        if self.hook_registry.contains(&HookId::new(entry.id.as_str())) {
            return Err(vec![format!("Plugin '{}' is already registered", entry.id)]);
        }
        self.check_entry(entry).await
    }

    /// Adds a plugin entry, registering it if enabled.
    pub async fn apply_configuration_add(&self, entry: &PluginEntryConfig) -> ConfigChangeResult {
        if !entry.enabled {
            return ConfigChangeResult::success();
        }
        match self.load_entry(entry).await {
            Ok(_) => ConfigChangeResult::success(),
            Err(e) => self.failure(&e),
        }
    }

    /// Checks whether a changed plugin entry is usable.
    pub async fn is_configuration_change_acceptable(
        &self,
        entry: &PluginEntryConfig,
    ) -> Result<(), Vec<String>> {
        self.check_entry(entry).await
    }

    /// Applies a changed plugin entry.
    ///
    /// Disabling deregisters the plugin and enabling registers it. For a
    /// plugin that stays enabled only the internal-operation flag changes
    /// in place; a different kind or category set needs the plugin to be
    /// disabled and enabled again.
    pub async fn apply_configuration_change(
        &self,
        entry: &PluginEntryConfig,
    ) -> ConfigChangeResult {
        let id = HookId::new(entry.id.as_str());

        let Some(existing) = self.hook_registry.get(&id) else {
            if !entry.enabled {
                return ConfigChangeResult::success();
            }
            return match self.load_entry(entry).await {
                Ok(_) => ConfigChangeResult::success(),
                Err(e) => self.failure(&e),
            };
        };

        if !entry.enabled {
            // Finalization waits for every holder of the registration.
            drop(existing);
            return match self.deregister_hook(&id).await {
                Ok(()) => ConfigChangeResult::success(),
                Err(e) => self.failure(&e),
            };
        }

        existing.set_invoke_for_internal(entry.invoke_for_internal_operations);

        let mut result = ConfigChangeResult::success();
        if !existing.kind().eq_ignore_ascii_case(&entry.kind) {
            result.admin_action_required = true;
            result = result.with_message(format!(
                "The kind of plugin '{}' changes to '{}' once it is disabled and re-enabled",
                entry.id, entry.kind
            ));
        }
        match configured_categories(entry) {
            Ok(categories) if &categories != existing.categories() => {
                result.admin_action_required = true;
                result = result.with_message(format!(
                    "The categories of plugin '{}' change once it is disabled and re-enabled",
                    entry.id
                ));
            }
            Ok(_) => {}
            Err(e) => return self.failure(&e),
        }

        if let Some(stored) = self.entries.write().await.get_mut(&id) {
            stored.invoke_for_internal_operations = entry.invoke_for_internal_operations;
            stored.settings = entry.settings.clone();
        }

        info!(
            hook_id = %id,
            invoke_for_internal_operations = entry.invoke_for_internal_operations,
            admin_action_required = result.admin_action_required,
            "Plugin configuration changed"
        );
        result
    }

    /// Removes a plugin entry, deregistering the plugin if registered.
    pub async fn apply_configuration_delete(&self, id: &HookId) -> ConfigChangeResult {
        if !self.hook_registry.contains(id) {
            return ConfigChangeResult::success();
        }
        match self.deregister_hook(id).await {
            Ok(()) => ConfigChangeResult::success(),
            // Lost a race with another delete.
            Err(e) if e.kind == ErrorKind::NotFound => {
                ConfigChangeResult::success()
            }
            Err(e) => self.failure(&e),
        }
    }

    /// Installs a new ordering expression for a category.
    pub async fn set_plugin_order(
        &self,
        category: HookCategory,
        raw: &str,
    ) -> Vec<OrderDiagnostic> {
        self.hook_registry.set_order(category, raw).await
    }

    /// Deregisters every hook and finalizes each once.
    pub async fn finalize_all(&self) {
        let hooks = self.hook_registry.drain().await;
        self.entries.write().await.clear();

        for hook in &hooks {
            wait_until_released(hook).await;
            hook.hook().finalize().await;
        }

        info!(count = hooks.len(), "All plugins finalized");
    }

    /// Returns the configuration a registered plugin was loaded with.
    pub async fn entry(&self, id: &HookId) -> Option<PluginEntryConfig> {
        self.entries.read().await.get(id).cloned()
    }

    /// Returns the hook dispatcher for firing hooks.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.hook_dispatcher
    }

    /// Returns the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns the skip tracker.
    pub fn skip_tracker(&self) -> &Arc<SkipTracker> {
        &self.skip_tracker
    }

    /// Returns the hook factories.
    pub fn factories(&self) -> &HookFactoryRegistry {
        &self.factories
    }

    async fn check_entry(&self, entry: &PluginEntryConfig) -> Result<(), Vec<String>> {
        let mut reasons = Vec::new();
        if let Err(e) = configured_categories(entry) {
            reasons.push(e.message);
        }
        if !entry.enabled {
            return if reasons.is_empty() { Ok(()) } else { Err(reasons) };
        }
        match self.factories.resolve(entry).await {
            Ok(factory) => {
                if let Err(mut invalid) = factory.validate(entry) {
                    reasons.append(&mut invalid);
                }
            }
            Err(e) => reasons.push(e.message),
        }
        if reasons.is_empty() { Ok(()) } else { Err(reasons) }
    }

    fn failure(&self, err: &AppError) -> ConfigChangeResult {
        let code = err
            .result_code
            .unwrap_or(self.hook_dispatcher.settings().server_error_result_code);
        ConfigChangeResult::failure(code, err.message.clone())
    }
}

/// Waits until no snapshot taken before a hook's removal still holds it.
async fn wait_until_released(hook: &Arc<RegisteredHook>) {
    let started = tokio::time::Instant::now();
    let mut warned = false;
    while Arc::strong_count(hook) > 1 {
        if !warned && started.elapsed() >= RELEASE_WARN_AFTER {
            warn!(
                hook_id = %hook.id(),
                "Still waiting for in-flight dispatches before finalizing plugin"
            );
            warned = true;
        }
        tokio::time::sleep(RELEASE_POLL_INTERVAL).await;
    }
}

fn configured_categories(entry: &PluginEntryConfig) -> AppResult<HookCategorySet> {
    parse_categories(entry.categories.as_slice()).map_err(|e| {
        AppError::configuration(format!("Plugin '{}': {e}", entry.id))
            .with_result_code(ResultCode::UnwillingToPerform)
    })
}
