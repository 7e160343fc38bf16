//! Traits implemented by extension hooks.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use dirsrv_core::types::{
    ClientConnectionInfo, DisconnectReason, Entry, IntermediateResponse, LdifExportConfig,
    LdifImportConfig, Modification, PluginOperation,
};

use crate::hooks::category::{CategoryFamily, HookCategory, HookCategorySet};
use crate::hooks::definitions::{HookAction, HookArgs, HookError, HookResult};

/// A unit of extension logic invoked at one or more categories.
///
/// Every method has a default that continues without output, so a hook
/// only implements the families it serves. Per-operation families receive
/// the concrete category so one method can serve several operation types.
#[async_trait]
pub trait DirectoryHook: Send + Sync + fmt::Debug {
    /// Categories this hook is able to serve. Configuring a hook for any
    /// other category is rejected at registration.
    fn supported_categories(&self) -> HookCategorySet;

    async fn startup(&self) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn shutdown(&self, _reason: &str) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn post_connect(&self, _connection: &ClientConnectionInfo) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn post_disconnect(
        &self,
        _connection: &ClientConnectionInfo,
        _reason: DisconnectReason,
        _message: Option<&str>,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn ldif_import_begin(&self, _config: &LdifImportConfig) -> HookResult {
        Ok(HookAction::proceed())
    }

    /// Called for each entry read from an import. Halting rejects the entry.
    async fn ldif_import(&self, _config: &LdifImportConfig, _entry: &Entry) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn ldif_import_end(&self, _config: &LdifImportConfig) -> HookResult {
        Ok(HookAction::proceed())
    }

    /// Called for each entry written by an export. Halting omits the entry.
    async fn ldif_export(&self, _config: &LdifExportConfig, _entry: &Entry) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn pre_parse(
        &self,
        _category: HookCategory,
        _operation: &dyn PluginOperation,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn pre_operation(
        &self,
        _category: HookCategory,
        _operation: &dyn PluginOperation,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn post_operation(
        &self,
        _category: HookCategory,
        _operation: &dyn PluginOperation,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn post_response(
        &self,
        _category: HookCategory,
        _operation: &dyn PluginOperation,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn post_synchronization(
        &self,
        _category: HookCategory,
        _operation: &dyn PluginOperation,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn search_result_entry(
        &self,
        _operation: &dyn PluginOperation,
        _entry: &Entry,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn search_result_reference(
        &self,
        _operation: &dyn PluginOperation,
        _referral_urls: &[String],
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn intermediate_response(
        &self,
        _operation: &dyn PluginOperation,
        _response: &IntermediateResponse,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn subordinate_modify_dn(
        &self,
        _operation: &dyn PluginOperation,
        _old_entry: &Entry,
        _new_entry: &Entry,
        _modifications: &[Modification],
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    async fn subordinate_delete(
        &self,
        _operation: &dyn PluginOperation,
        _entry: &Entry,
    ) -> HookResult {
        Ok(HookAction::proceed())
    }

    /// Routes one dispatch to the method of the category's family.
    ///
    /// Hooks normally leave this alone. Overriding it receives every
    /// category through a single entry point.
    async fn invoke(&self, category: HookCategory, args: HookArgs<'_>) -> HookResult {
        match (category.family(), args) {
            (CategoryFamily::PreParse, HookArgs::Operation { operation }) => {
                self.pre_parse(category, operation).await
            }
            (CategoryFamily::PreOperation, HookArgs::Operation { operation }) => {
                self.pre_operation(category, operation).await
            }
            (CategoryFamily::PostOperation, HookArgs::Operation { operation }) => {
                self.post_operation(category, operation).await
            }
            (CategoryFamily::PostResponse, HookArgs::Operation { operation }) => {
                self.post_response(category, operation).await
            }
            (CategoryFamily::PostSynchronization, HookArgs::Operation { operation }) => {
                self.post_synchronization(category, operation).await
            }
            (_, HookArgs::Startup) => self.startup().await,
            (_, HookArgs::Shutdown { reason }) => self.shutdown(reason).await,
            (_, HookArgs::PostConnect { connection }) => self.post_connect(connection).await,
            (
                _,
                HookArgs::PostDisconnect {
                    connection,
                    reason,
                    message,
                },
            ) => self.post_disconnect(connection, reason, message).await,
            (_, HookArgs::LdifImportJob { config }) => match category {
                HookCategory::LdifImportBegin => self.ldif_import_begin(config).await,
                HookCategory::LdifImportEnd => self.ldif_import_end(config).await,
                _ => Err(HookError::Unsupported(category)),
            },
            (_, HookArgs::LdifImport { config, entry }) => self.ldif_import(config, entry).await,
            (_, HookArgs::LdifExport { config, entry }) => self.ldif_export(config, entry).await,
            (_, HookArgs::SearchResultEntry { operation, entry }) => {
                self.search_result_entry(operation, entry).await
            }
            (
                _,
                HookArgs::SearchResultReference {
                    operation,
                    referral_urls,
                },
            ) => self.search_result_reference(operation, referral_urls).await,
            (_, HookArgs::IntermediateResponse { operation, response }) => {
                self.intermediate_response(operation, response).await
            }
            (
                _,
                HookArgs::SubordinateModifyDn {
                    operation,
                    old_entry,
                    new_entry,
                    modifications,
                },
            ) => {
                self.subordinate_modify_dn(operation, old_entry, new_entry, modifications)
                    .await
            }
            (_, HookArgs::SubordinateDelete { operation, entry }) => {
                self.subordinate_delete(operation, entry).await
            }
            (_, HookArgs::Operation { .. }) => Err(HookError::Unsupported(category)),
        }
    }

    /// Called exactly once after the hook has been removed from every
    /// category. No further invocations follow.
    async fn finalize(&self) {}
}

type BoxedHookFn = Arc<
    dyn Fn(HookCategory, HookArgs<'_>) -> Pin<Box<dyn Future<Output = HookResult> + Send>>
        + Send
        + Sync,
>;

/// A closure-based hook for quick hook creation.
///
/// The closure sees every category through one entry point. It must copy
/// whatever it needs out of the arguments before returning its future.
pub struct ClosureHook {
    /// Categories served.
    categories: HookCategorySet,
    /// Handler function.
    handler: BoxedHookFn,
}

impl fmt::Debug for ClosureHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureHook")
            .field("categories", &self.categories)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHook {
    /// Creates a new closure-based hook.
    pub fn new<F, Fut>(categories: HookCategorySet, handler: F) -> Self
    where
        F: Fn(HookCategory, HookArgs<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self {
            categories,
            handler: Arc::new(
                move |category: HookCategory,
                      args: HookArgs<'_>|
                      -> Pin<Box<dyn Future<Output = HookResult> + Send>> {
                    Box::pin(handler(category, args))
                },
            ),
        }
    }

    /// Wraps the hook into an `Arc<dyn DirectoryHook>`.
    pub fn into_hook(self) -> Arc<dyn DirectoryHook> {
        Arc::new(self)
    }
}

#[async_trait]
impl DirectoryHook for ClosureHook {
    fn supported_categories(&self) -> HookCategorySet {
        self.categories.clone()
    }

    async fn invoke(&self, category: HookCategory, args: HookArgs<'_>) -> HookResult {
        (self.handler)(category, args).await
    }
}
