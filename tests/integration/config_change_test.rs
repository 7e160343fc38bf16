//! Configuration-driven loading and live reconfiguration of plugins.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dirsrv_core::config::plugin::PluginEntryConfig;
use dirsrv_core::types::{OperationInfo, OperationType, ResultCode};
use dirsrv_plugin::factory::HookFactory;
use dirsrv_plugin::hooks::{HookArgs, HookCategory, HookError, HookId};
use dirsrv_plugin::manager::PluginManager;
use dirsrv_plugin::traits::DirectoryHook;

use crate::helpers::{Journal, RecordingHook, drain, entry, journal, manager};

const PRE_DELETE: HookCategory = HookCategory::PreOperationDelete;

/// Builds recording hooks and keeps hold of each one it builds.
#[derive(Debug)]
struct RecordingFactory {
    journal: Journal,
    built: Mutex<Vec<Arc<RecordingHook>>>,
}

impl RecordingFactory {
    fn new(journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            built: Mutex::new(Vec::new()),
        })
    }

    fn built(&self) -> Vec<Arc<RecordingHook>> {
        self.built.lock().expect("built").clone()
    }
}

#[async_trait]
impl HookFactory for RecordingFactory {
    fn kind(&self) -> &str {
        "recording"
    }

    fn validate(&self, entry: &PluginEntryConfig) -> Result<(), Vec<String>> {
        match entry.get_string("name") {
            Some(_) => Ok(()),
            None => Err(vec![format!("{}: missing setting 'name'", entry.id)]),
        }
    }

    async fn create(&self, entry: &PluginEntryConfig) -> Result<Arc<dyn DirectoryHook>, HookError> {
        let name = entry
            .get_string("name")
            .ok_or_else(|| HookError::Configuration("missing name".to_string()))?;
        if name == "unbuildable" {
            return Err(HookError::Failed("cannot build".to_string()));
        }
        let hook = Arc::new(RecordingHook::new(name, &self.journal));
        self.built.lock().expect("built").push(hook.clone());
        Ok(hook)
    }
}

fn named(id: &str, name: &str, categories: &[HookCategory]) -> PluginEntryConfig {
    let mut entry = entry(id, categories);
    entry
        .settings
        .insert("name".to_string(), serde_json::Value::from(name));
    entry
}

async fn manager_with_factory(log: &Journal) -> (PluginManager, Arc<RecordingFactory>) {
    let manager = manager().await;
    let factory = RecordingFactory::new(log);
    manager
        .register_factory(factory.clone())
        .await
        .expect("register factory");
    (manager, factory)
}

async fn run_delete(manager: &PluginManager, internal: bool) {
    let op = if internal {
        OperationInfo::internal(OperationType::Delete, 1)
    } else {
        OperationInfo::new(OperationType::Delete, 1, 1)
    };
    manager
        .dispatcher()
        .dispatch(PRE_DELETE, &HookArgs::Operation { operation: &op })
        .await;
}

#[tokio::test]
async fn test_initialize_skips_unusable_entries() {
    let log = journal();
    let (manager, _factory) = manager_with_factory(&log).await;

    let mut unknown_kind = named("cn=Unknown,cn=Plugins,cn=config", "unknown", &[PRE_DELETE]);
    unknown_kind.kind = "no-such-kind".to_string();
    let mut bad_category = named("cn=Typo,cn=Plugins,cn=config", "typo", &[]);
    bad_category.categories.push("pre-operation-deleet".to_string());

    let entries = vec![
        named("cn=Good,cn=Plugins,cn=config", "good", &[PRE_DELETE]),
        unknown_kind,
        bad_category,
        entry("cn=Unnamed,cn=Plugins,cn=config", &[PRE_DELETE]),
        named("cn=Broken,cn=Plugins,cn=config", "unbuildable", &[PRE_DELETE]),
        named("cn=Off,cn=Plugins,cn=config", "off", &[PRE_DELETE]).with_enabled(false),
    ];

    let loaded = manager.initialize(&entries).await;

    assert_eq!(loaded, 1);
    assert_eq!(
        manager.registry().registered_ids(),
        [HookId::new("cn=Good,cn=Plugins,cn=config")]
    );
    run_delete(&manager, false).await;
    assert_eq!(drain(&log), ["good:pre-operation-delete"]);
}

#[tokio::test]
async fn test_add_then_delete_entry() {
    let log = journal();
    let (manager, factory) = manager_with_factory(&log).await;
    let added = named("cn=Audit,cn=Plugins,cn=config", "audit", &[PRE_DELETE]);

    assert!(manager.is_configuration_add_acceptable(&added).await.is_ok());
    assert!(manager.apply_configuration_add(&added).await.is_success());
    assert_eq!(
        manager.entry(&HookId::new(added.id.as_str())).await,
        Some(added.clone())
    );

    let reasons = manager
        .is_configuration_add_acceptable(&added)
        .await
        .expect_err("already registered");
    assert_eq!(reasons.len(), 1);

    run_delete(&manager, false).await;
    assert_eq!(drain(&log), ["audit:pre-operation-delete"]);

    let id = HookId::new(added.id.as_str());
    assert!(manager.apply_configuration_delete(&id).await.is_success());
    assert_eq!(factory.built()[0].finalize_count(), 1);
    run_delete(&manager, false).await;
    assert!(drain(&log).is_empty());

    // Deleting an unknown entry is a no-op.
    assert!(manager.apply_configuration_delete(&id).await.is_success());
    assert_eq!(factory.built()[0].finalize_count(), 1);
}

#[tokio::test]
async fn test_invalid_entries_are_unacceptable() {
    let log = journal();
    let (manager, _factory) = manager_with_factory(&log).await;

    let unnamed = entry("cn=Unnamed,cn=Plugins,cn=config", &[PRE_DELETE]);
    let reasons = manager
        .is_configuration_add_acceptable(&unnamed)
        .await
        .expect_err("missing name");
    assert!(reasons[0].contains("name"));

    let mut typo = named("cn=Typo,cn=Plugins,cn=config", "typo", &[]);
    typo.categories.push("postoperation".to_string());
    let result = manager.apply_configuration_add(&typo).await;
    assert_eq!(result.result_code, ResultCode::UnwillingToPerform);
    assert!(manager.registry().is_empty());

    let unbuildable = named("cn=Broken,cn=Plugins,cn=config", "unbuildable", &[PRE_DELETE]);
    let result = manager.apply_configuration_add(&unbuildable).await;
    assert!(!result.is_success());
    assert_eq!(result.result_code, ResultCode::Other);
}

#[tokio::test]
async fn test_change_internal_flag_applies_live() {
    let log = journal();
    let (manager, _factory) = manager_with_factory(&log).await;
    let original = named("cn=Audit,cn=Plugins,cn=config", "audit", &[PRE_DELETE]);
    assert!(manager.apply_configuration_add(&original).await.is_success());

    run_delete(&manager, true).await;
    assert_eq!(drain(&log).len(), 1);

    let changed = original.clone().with_internal_operations(false);
    assert!(manager.is_configuration_change_acceptable(&changed).await.is_ok());
    let result = manager.apply_configuration_change(&changed).await;
    assert!(result.is_success());
    assert!(!result.admin_action_required);

    run_delete(&manager, true).await;
    assert!(drain(&log).is_empty());
    run_delete(&manager, false).await;
    assert_eq!(drain(&log), ["audit:pre-operation-delete"]);

    let stored = manager
        .entry(&HookId::new(original.id.as_str()))
        .await
        .expect("stored entry");
    assert!(!stored.invoke_for_internal_operations);
}

#[tokio::test]
async fn test_change_of_categories_needs_admin_action() {
    let log = journal();
    let (manager, _factory) = manager_with_factory(&log).await;
    let original = named("cn=Audit,cn=Plugins,cn=config", "audit", &[PRE_DELETE]);
    assert!(manager.apply_configuration_add(&original).await.is_success());

    let changed = original.clone().with_category("post-response-delete");
    let result = manager.apply_configuration_change(&changed).await;
    assert!(result.is_success());
    assert!(result.admin_action_required);
    assert_eq!(result.messages.len(), 1);

    // The running plugin keeps its original categories.
    assert_eq!(
        manager.registry().hook_count(HookCategory::PostResponseDelete),
        0
    );
    run_delete(&manager, false).await;
    assert_eq!(drain(&log), ["audit:pre-operation-delete"]);
}

#[tokio::test]
async fn test_disable_and_enable_through_change() {
    let log = journal();
    let (manager, factory) = manager_with_factory(&log).await;
    let original = named("cn=Audit,cn=Plugins,cn=config", "audit", &[PRE_DELETE]);
    assert!(manager.apply_configuration_add(&original).await.is_success());

    let disabled = original.clone().with_enabled(false);
    assert!(manager.apply_configuration_change(&disabled).await.is_success());
    assert!(manager.registry().is_empty());
    assert_eq!(factory.built()[0].finalize_count(), 1);

    // Disabling again is harmless.
    assert!(manager.apply_configuration_change(&disabled).await.is_success());

    let enabled = original.with_category("post-response-delete");
    assert!(manager.apply_configuration_change(&enabled).await.is_success());
    assert_eq!(factory.built().len(), 2);
    assert_eq!(
        manager.registry().hook_count(HookCategory::PostResponseDelete),
        1
    );
}

#[tokio::test]
async fn test_disabled_entry_add_is_accepted_without_registering() {
    let log = journal();
    let (manager, factory) = manager_with_factory(&log).await;
    let disabled = named("cn=Off,cn=Plugins,cn=config", "off", &[PRE_DELETE]).with_enabled(false);

    assert!(manager.is_configuration_add_acceptable(&disabled).await.is_ok());
    assert!(manager.apply_configuration_add(&disabled).await.is_success());
    assert!(manager.registry().is_empty());
    assert!(factory.built().is_empty());
}
