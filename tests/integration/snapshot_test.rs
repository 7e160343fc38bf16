//! In-flight dispatches keep the hook list they started with.

use std::sync::Arc;

use tokio::sync::Notify;

use dirsrv_core::types::{OperationInfo, OperationType};
use dirsrv_plugin::hooks::{HookArgs, HookCategory, HookId};

use crate::helpers::{Behavior, RecordingHook, drain, journal, manager, register};

const PRE_MODIFY: HookCategory = HookCategory::PreOperationModify;

#[tokio::test]
async fn test_dispatch_uses_snapshot_taken_at_start() {
    let manager = manager().await;
    let log = journal();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    register(
        &manager,
        "A",
        &[PRE_MODIFY],
        RecordingHook::new("A", &log).with(
            PRE_MODIFY,
            Behavior::Block {
                entered: entered.clone(),
                release: release.clone(),
            },
        ),
    )
    .await;
    let b = register(
        &manager,
        "B",
        &[PRE_MODIFY],
        RecordingHook::new("B", &log).journaling_finalize(),
    )
    .await;
    register(&manager, "C", &[PRE_MODIFY], RecordingHook::new("C", &log)).await;

    let op = OperationInfo::new(OperationType::Modify, 1, 1);
    let args = HookArgs::Operation { operation: &op };

    let in_flight = manager.dispatcher().dispatch(PRE_MODIFY, &args);
    let reconfigure = async {
        entered.notified().await;
        let remove_b = async {
            manager
                .deregister_hook(&HookId::new("B"))
                .await
                .expect("deregister B");
        };
        let add_d_then_release = async {
            register(&manager, "D", &[PRE_MODIFY], RecordingHook::new("D", &log)).await;
            // B is still referenced by the blocked dispatch.
            tokio::task::yield_now().await;
            assert_eq!(b.finalize_count(), 0);
            release.notify_one();
        };
        tokio::join!(remove_b, add_d_then_release);
    };
    let (outcome, ()) = tokio::join!(in_flight, reconfigure);

    assert!(outcome.is_continue());
    assert_eq!(
        drain(&log),
        [
            "A:pre-operation-modify",
            "B:pre-operation-modify",
            "C:pre-operation-modify",
            "B:finalize",
        ]
    );
    assert_eq!(b.finalize_count(), 1);

    // Let the next pass through A go straight on.
    release.notify_one();
    let next = OperationInfo::new(OperationType::Modify, 1, 2);
    manager
        .dispatcher()
        .dispatch(PRE_MODIFY, &HookArgs::Operation { operation: &next })
        .await;
    assert_eq!(
        drain(&log),
        [
            "A:pre-operation-modify",
            "C:pre-operation-modify",
            "D:pre-operation-modify",
        ]
    );
    assert_eq!(b.finalize_count(), 1);
}

#[tokio::test]
async fn test_finalize_all_waits_for_in_flight_dispatch() {
    let manager = manager().await;
    let log = journal();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let a = register(
        &manager,
        "A",
        &[PRE_MODIFY],
        RecordingHook::new("A", &log)
            .with(
                PRE_MODIFY,
                Behavior::Block {
                    entered: entered.clone(),
                    release: release.clone(),
                },
            )
            .journaling_finalize(),
    )
    .await;

    let op = OperationInfo::new(OperationType::Modify, 1, 1);
    let args = HookArgs::Operation { operation: &op };

    let in_flight = manager.dispatcher().dispatch(PRE_MODIFY, &args);
    let shutdown = async {
        entered.notified().await;
        tokio::join!(manager.finalize_all(), async {
            tokio::task::yield_now().await;
            assert_eq!(a.finalize_count(), 0);
            release.notify_one();
        });
    };
    let (outcome, ()) = tokio::join!(in_flight, shutdown);

    assert!(outcome.is_continue());
    assert_eq!(drain(&log), ["A:pre-operation-modify", "A:finalize"]);
    assert!(manager.registry().is_empty());
}

#[tokio::test]
async fn test_snapshot_survives_registry_changes() {
    let manager = manager().await;
    let log = journal();
    register(&manager, "A", &[PRE_MODIFY], RecordingHook::new("A", &log)).await;

    let before = manager.registry().snapshot(PRE_MODIFY);
    register(&manager, "B", &[PRE_MODIFY], RecordingHook::new("B", &log)).await;
    manager
        .registry()
        .deregister(&HookId::new("A"))
        .await
        .expect("deregister A");
    let after = manager.registry().snapshot(PRE_MODIFY);

    let ids = |snapshot: &[Arc<dirsrv_plugin::hooks::RegisteredHook>]| {
        snapshot
            .iter()
            .map(|h| h.id().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(before.as_slice()), ["A"]);
    assert_eq!(ids(after.as_slice()), ["B"]);
}

#[tokio::test]
async fn test_concurrent_dispatches_share_the_registry() {
    let manager = Arc::new(manager().await);
    let log = journal();
    register(&manager, "A", &[PRE_MODIFY], RecordingHook::new("A", &log)).await;

    let tasks: Vec<_> = (0..8)
        .map(|operation_id| {
            let manager = manager.clone();
            tokio::spawn(async move {
                let op = OperationInfo::new(OperationType::Modify, 1, operation_id);
                manager
                    .dispatcher()
                    .dispatch(PRE_MODIFY, &HookArgs::Operation { operation: &op })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.expect("join").is_continue());
    }
    assert_eq!(drain(&log).len(), 8);
}
