//! Ordering of hooks within a category.

use dirsrv_core::types::{OperationInfo, OperationType};
use dirsrv_plugin::hooks::{HookArgs, HookCategory, HookId, OrderDiagnostic};

use crate::helpers::{RecordingHook, drain, journal, manager, manager_with_order, register};

const PRE_ADD: HookCategory = HookCategory::PreOperationAdd;
const POST_ADD: HookCategory = HookCategory::PostOperationAdd;

#[tokio::test]
async fn test_initial_wildcard_final_ordering() {
    let manager = manager_with_order(&[("pre-operation-add", "a, b, *, c")]).await;
    let log = journal();
    for name in ["b", "a", "c", "d", "e"] {
        register(&manager, name, &[PRE_ADD], RecordingHook::new(name, &log)).await;
    }

    let op = OperationInfo::new(OperationType::Add, 1, 1);
    let outcome = manager
        .dispatcher()
        .dispatch(PRE_ADD, &HookArgs::Operation { operation: &op })
        .await;

    assert!(outcome.is_continue());
    assert_eq!(
        drain(&log),
        [
            "a:pre-operation-add",
            "b:pre-operation-add",
            "d:pre-operation-add",
            "e:pre-operation-add",
            "c:pre-operation-add",
        ]
    );
}

#[tokio::test]
async fn test_named_hook_runs_first_until_deregistered() {
    let manager = manager_with_order(&[("pre-operation-add", "Y,*")]).await;
    let log = journal();
    register(&manager, "X", &[PRE_ADD], RecordingHook::new("X", &log)).await;
    register(&manager, "Y", &[PRE_ADD], RecordingHook::new("Y", &log)).await;

    let op = OperationInfo::new(OperationType::Add, 1, 1);
    let args = HookArgs::Operation { operation: &op };
    manager.dispatcher().dispatch(PRE_ADD, &args).await;
    assert_eq!(drain(&log), ["Y:pre-operation-add", "X:pre-operation-add"]);

    manager
        .deregister_hook(&HookId::new("Y"))
        .await
        .expect("deregister");
    manager.dispatcher().dispatch(PRE_ADD, &args).await;
    assert_eq!(drain(&log), ["X:pre-operation-add"]);
}

#[tokio::test]
async fn test_unordered_hooks_keep_arrival_order_in_paired_categories() {
    let manager = manager().await;
    let log = journal();
    for name in ["first", "second", "third"] {
        register(
            &manager,
            &format!("cn={name},cn=Plugins,cn=config"),
            &[PRE_ADD, POST_ADD],
            RecordingHook::new(name, &log),
        )
        .await;
    }

    let op = OperationInfo::new(OperationType::Add, 1, 1);
    let args = HookArgs::Operation { operation: &op };
    manager.dispatcher().dispatch(PRE_ADD, &args).await;
    manager.dispatcher().dispatch(POST_ADD, &args).await;

    assert_eq!(
        drain(&log),
        [
            "first:pre-operation-add",
            "second:pre-operation-add",
            "third:pre-operation-add",
            "first:post-operation-add",
            "second:post-operation-add",
            "third:post-operation-add",
        ]
    );
}

#[tokio::test]
async fn test_order_change_rearranges_live_hooks() {
    let manager = manager().await;
    let log = journal();
    for name in ["a", "b", "c"] {
        register(
            &manager,
            &format!("cn={name},cn=Plugins,cn=config"),
            &[PRE_ADD],
            RecordingHook::new(name, &log),
        )
        .await;
    }

    let diagnostics = manager.set_plugin_order(PRE_ADD, "*, A").await;
    assert!(diagnostics.is_empty());

    let op = OperationInfo::new(OperationType::Add, 1, 1);
    manager
        .dispatcher()
        .dispatch(PRE_ADD, &HookArgs::Operation { operation: &op })
        .await;
    assert_eq!(
        drain(&log),
        [
            "b:pre-operation-add",
            "c:pre-operation-add",
            "a:pre-operation-add",
        ]
    );
}

#[tokio::test]
async fn test_malformed_order_is_applied_best_effort() {
    let manager = manager().await;
    let log = journal();
    for name in ["a", "b", "c"] {
        register(&manager, name, &[PRE_ADD], RecordingHook::new(name, &log)).await;
    }

    let diagnostics = manager.set_plugin_order(PRE_ADD, "c,,c").await;
    assert_eq!(
        diagnostics,
        [
            OrderDiagnostic::EmptyElement,
            OrderDiagnostic::DuplicateName("c".to_string()),
            OrderDiagnostic::MissingWildcard,
        ]
    );

    let op = OperationInfo::new(OperationType::Add, 1, 1);
    manager
        .dispatcher()
        .dispatch(PRE_ADD, &HookArgs::Operation { operation: &op })
        .await;
    assert_eq!(
        drain(&log),
        [
            "c:pre-operation-add",
            "a:pre-operation-add",
            "b:pre-operation-add",
        ]
    );
}
