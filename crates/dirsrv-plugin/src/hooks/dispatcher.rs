//! Hook dispatcher: runs the hooks of one category in order and aggregates
//! their results into a single outcome.
//!
//! Gating categories (startup, pre-parse, pre-operation, result streaming,
//! ...) stop at the first halt and return it. Observational categories
//! (shutdown, post-operation, post-response, ...) invoke every hook and
//! return the last halt seen, if any.
//!
//! Outputs are folded as the hooks run, so each hook builds on what the
//! hooks before it produced.
//!
//! A hook that returns an error, panics, times out, or halts with a success
//! result code never escapes the dispatcher: the failure is logged and
//! turned into a server-error halt.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use dirsrv_core::config::plugin::PluginConfig;
use dirsrv_core::error::AppError;
use dirsrv_core::result::AppResult;
use dirsrv_core::types::{OperationKey, ResultCode};

use super::artifact::DispatchArtifact;
use super::category::{DispatchMode, HookCategory};
use super::definitions::{DispatchOutcome, HaltResult, HookAction, HookArgs};
use super::registry::{HookRegistry, RegisteredHook};
use super::skip::SkipTracker;

/// Dispatcher tuning taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Result code of halts produced for failing hooks.
    pub server_error_result_code: ResultCode,
    /// Upper bound on a single hook invocation.
    pub hook_timeout: Option<Duration>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            server_error_result_code: ResultCode::Other,
            hook_timeout: None,
        }
    }
}

impl From<&PluginConfig> for DispatcherSettings {
    fn from(config: &PluginConfig) -> Self {
        Self {
            server_error_result_code: config.server_error_result_code,
            hook_timeout: config.hook_timeout_seconds.map(Duration::from_secs),
        }
    }
}

/// Dispatches categories to their registered hooks.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Skip records shared by pre- and post-operation dispatch.
    skips: Arc<SkipTracker>,
    /// Tuning.
    settings: DispatcherSettings,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(
        registry: Arc<HookRegistry>,
        skips: Arc<SkipTracker>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            registry,
            skips,
            settings,
        }
    }

    /// Runs the hooks of a category.
    pub async fn dispatch(&self, category: HookCategory, args: &HookArgs<'_>) -> DispatchOutcome {
        if !args.accepts(category) {
            error!(
                category = %category,
                args = args.kind(),
                "Dispatch arguments do not match category"
            );
            return DispatchOutcome::Halt(self.server_error(format!(
                "Internal error dispatching {category} plugins"
            )));
        }

        let hooks = self.registry.snapshot(category);
        let operation = args.operation();

        // The skip record is consumed even when nothing is registered, so
        // no record outlives its operation.
        let skipped = match operation {
            Some(op) if category.honors_skips() => self.skips.take_skip(op.key()),
            _ => Vec::new(),
        };

        if hooks.is_empty() {
            return DispatchOutcome::proceed();
        }

        debug!(
            category = %category,
            hook_count = hooks.len(),
            skipped = skipped.len(),
            connection_id = operation.map(|op| op.connection_id()),
            operation_id = operation.map(|op| op.operation_id()),
            "Dispatching hooks"
        );

        let mode = category.dispatch_mode();
        let mut artifact = DispatchArtifact::new();
        let mut pending: Option<HaltResult> = None;

        for (index, hook) in hooks.iter().enumerate() {
            if skipped.contains(hook.id()) {
                debug!(
                    category = %category,
                    hook_id = %hook.id(),
                    "Skipping hook whose pre-operation half did not run"
                );
                continue;
            }

            if let Some(op) = operation {
                if op.is_internal() && !hook.invokes_for_internal() {
                    if category.records_filtered_internal() {
                        self.skips.record_single(op.key(), hook.id().clone());
                    }
                    continue;
                }
            }

            let action = self.invoke(category, hook, artifact.thread(*args)).await;
            match self.absorb(category, hook, &mut artifact, args, action) {
                HookAction::Continue(_) => {}
                HookAction::SkipRemaining(_) => {
                    // The skipping hook loses its post-operation half too.
                    if let Some(op) = operation.filter(|_| category.records_skips()) {
                        self.record_skips(op.key(), &hooks[index..]);
                    }
                    debug!(
                        category = %category,
                        hook_id = %hook.id(),
                        "Hook skipped the remaining hooks"
                    );
                    break;
                }
                HookAction::Halt(halt) => match mode {
                    DispatchMode::Gating => {
                        if let Some(op) = operation.filter(|_| category.records_skips()) {
                            self.record_skips(op.key(), &hooks[index..]);
                        }
                        info!(
                            category = %category,
                            hook_id = %hook.id(),
                            result_code = %halt.result_code,
                            message = %halt.message,
                            "Hook halted processing"
                        );
                        return DispatchOutcome::Halt(halt);
                    }
                    DispatchMode::Observational => {
                        warn!(
                            category = %category,
                            hook_id = %hook.id(),
                            result_code = %halt.result_code,
                            message = %halt.message,
                            "Hook returned a halt, remaining hooks still notified"
                        );
                        pending = Some(halt);
                    }
                },
            }
        }

        match pending {
            Some(halt) => DispatchOutcome::Halt(halt),
            None => DispatchOutcome::Continue {
                output: artifact.into_output(),
            },
        }
    }

    /// Runs a category and converts a halt into an error.
    ///
    /// Convenience for callers where a halt should abort the current
    /// operation. Returns the output artifact on success.
    pub async fn fire_or_halt(
        &self,
        category: HookCategory,
        args: &HookArgs<'_>,
    ) -> AppResult<Option<serde_json::Value>> {
        self.dispatch(category, args).await.into_result().map_err(|halt| {
            AppError::plugin(format!(
                "Processing stopped by {category} plugin: {}",
                halt.message
            ))
            .with_result_code(halt.result_code)
        })
    }

    /// Drops the skip record of an operation that ended before its
    /// post-operation dispatch.
    pub fn abandon(&self, key: OperationKey) {
        if self.skips.abandon(key) {
            debug!(operation_key = %key, "Dropped skip record of abandoned operation");
        }
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Returns the skip tracker.
    pub fn skip_tracker(&self) -> &Arc<SkipTracker> {
        &self.skips
    }

    /// Returns the settings the dispatcher was built with.
    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    fn record_skips(&self, key: OperationKey, hooks: &[Arc<RegisteredHook>]) {
        if !hooks.is_empty() {
            self.skips
                .record_skip(key, hooks.iter().map(|h| h.id().clone()));
        }
    }

    /// Folds the output of an action into the artifact. An output of the
    /// wrong shape is a contract violation.
    fn absorb(
        &self,
        category: HookCategory,
        hook: &RegisteredHook,
        artifact: &mut DispatchArtifact,
        args: &HookArgs<'_>,
        action: HookAction,
    ) -> HookAction {
        let (value, skip_remaining) = match action {
            HookAction::Continue(Some(value)) => (value, false),
            HookAction::SkipRemaining(Some(value)) => (value, true),
            other => return other,
        };

        if let Err(e) = artifact.absorb(args, value) {
            let operation = args.operation();
            error!(
                category = %category,
                hook_id = %hook.id(),
                connection_id = operation.map(|op| op.connection_id()),
                operation_id = operation.map(|op| op.operation_id()),
                error = %e,
                "Hook returned an unusable output"
            );
            return HookAction::Halt(self.server_error(format!(
                "The {category} plugin '{}' returned an invalid result",
                hook.id()
            )));
        }

        if skip_remaining {
            HookAction::SkipRemaining(None)
        } else {
            HookAction::proceed()
        }
    }

    /// Invokes one hook, converting every failure into a server-error halt.
    async fn invoke(
        &self,
        category: HookCategory,
        hook: &RegisteredHook,
        args: HookArgs<'_>,
    ) -> HookAction {
        let operation = args.operation();
        let call = AssertUnwindSafe(hook.hook().invoke(category, args)).catch_unwind();

        let result = match self.settings.hook_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        category = %category,
                        hook_id = %hook.id(),
                        connection_id = operation.map(|op| op.connection_id()),
                        operation_id = operation.map(|op| op.operation_id()),
                        timeout_secs = limit.as_secs(),
                        "Hook timed out"
                    );
                    return HookAction::Halt(self.server_error(format!(
                        "The {category} plugin '{}' did not complete in time",
                        hook.id()
                    )));
                }
            },
            None => call.await,
        };

        match result {
            Ok(Ok(HookAction::Halt(halt))) if halt.result_code.is_success() => {
                error!(
                    category = %category,
                    hook_id = %hook.id(),
                    connection_id = operation.map(|op| op.connection_id()),
                    operation_id = operation.map(|op| op.operation_id()),
                    "Hook halted with a success result code"
                );
                HookAction::Halt(self.server_error(format!(
                    "The {category} plugin '{}' returned an invalid result",
                    hook.id()
                )))
            }
            Ok(Ok(action)) => action,
            Ok(Err(err)) => {
                error!(
                    category = %category,
                    hook_id = %hook.id(),
                    connection_id = operation.map(|op| op.connection_id()),
                    operation_id = operation.map(|op| op.operation_id()),
                    error = %err,
                    "Hook failed"
                );
                HookAction::Halt(self.server_error(format!(
                    "The {category} plugin '{}' failed: {err}",
                    hook.id()
                )))
            }
            Err(panic) => {
                error!(
                    category = %category,
                    hook_id = %hook.id(),
                    connection_id = operation.map(|op| op.connection_id()),
                    operation_id = operation.map(|op| op.operation_id()),
                    panic = %panic_message(panic.as_ref()),
                    "Hook panicked"
                );
                HookAction::Halt(self.server_error(format!(
                    "The {category} plugin '{}' failed unexpectedly",
                    hook.id()
                )))
            }
        }
    }

    fn server_error(&self, message: String) -> HaltResult {
        HaltResult::new(self.settings.server_error_result_code, message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
