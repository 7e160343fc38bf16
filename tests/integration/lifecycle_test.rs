//! Startup, shutdown, deregistration and finalization.

use dirsrv_core::error::ErrorKind;
use dirsrv_core::types::ResultCode;
use dirsrv_plugin::hooks::{HookArgs, HookCategory, HookId};

use crate::helpers::{Behavior, RecordingHook, drain, journal, manager, register};

#[tokio::test]
async fn test_startup_stops_at_first_failing_hook() {
    let manager = manager().await;
    let log = journal();
    register(
        &manager,
        "first",
        &[HookCategory::Startup],
        RecordingHook::new("first", &log)
            .with(HookCategory::Startup, Behavior::Halt(ResultCode::UnwillingToPerform)),
    )
    .await;
    register(
        &manager,
        "second",
        &[HookCategory::Startup],
        RecordingHook::new("second", &log),
    )
    .await;

    let outcome = manager
        .dispatcher()
        .dispatch(HookCategory::Startup, &HookArgs::Startup)
        .await;

    let halt = outcome.halt_result().expect("startup halted");
    assert_eq!(halt.result_code, ResultCode::UnwillingToPerform);
    assert_eq!(drain(&log), ["first:startup"]);
}

#[tokio::test]
async fn test_shutdown_notifies_every_hook() {
    let manager = manager().await;
    let log = journal();
    register(
        &manager,
        "first",
        &[HookCategory::Shutdown],
        RecordingHook::new("first", &log).with(HookCategory::Shutdown, Behavior::Fail),
    )
    .await;
    register(
        &manager,
        "second",
        &[HookCategory::Shutdown],
        RecordingHook::new("second", &log),
    )
    .await;

    let outcome = manager
        .dispatcher()
        .dispatch(HookCategory::Shutdown, &HookArgs::Shutdown { reason: "test" })
        .await;

    assert!(outcome.is_halt());
    assert_eq!(drain(&log), ["first:shutdown", "second:shutdown"]);
}

#[tokio::test]
async fn test_deregister_finalizes_exactly_once() {
    let manager = manager().await;
    let log = journal();
    let hook = register(
        &manager,
        "cn=Audit,cn=Plugins,cn=config",
        &[HookCategory::PostResponseAdd, HookCategory::PostResponseDelete],
        RecordingHook::new("audit", &log),
    )
    .await;
    let id = HookId::new("cn=Audit,cn=Plugins,cn=config");

    manager.deregister_hook(&id).await.expect("deregister");
    assert_eq!(hook.finalize_count(), 1);
    assert!(!manager.registry().contains(&id));
    assert_eq!(manager.registry().hook_count(HookCategory::PostResponseAdd), 0);
    assert!(manager.entry(&id).await.is_none());

    let err = manager.deregister_hook(&id).await.expect_err("already gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(hook.finalize_count(), 1);
}

#[tokio::test]
async fn test_finalize_all_finalizes_every_hook() {
    let manager = manager().await;
    let log = journal();
    let first = register(
        &manager,
        "first",
        &[HookCategory::Startup, HookCategory::Shutdown],
        RecordingHook::new("first", &log),
    )
    .await;
    let second = register(
        &manager,
        "second",
        &[HookCategory::PostConnect],
        RecordingHook::new("second", &log),
    )
    .await;

    manager.finalize_all().await;

    assert_eq!(first.finalize_count(), 1);
    assert_eq!(second.finalize_count(), 1);
    assert!(manager.registry().is_empty());

    let outcome = manager
        .dispatcher()
        .dispatch(HookCategory::Shutdown, &HookArgs::Shutdown { reason: "test" })
        .await;
    assert!(outcome.is_continue());
    assert!(drain(&log).is_empty());
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let manager = manager().await;
    let log = journal();
    register(
        &manager,
        "dup",
        &[HookCategory::Startup],
        RecordingHook::new("dup", &log),
    )
    .await;

    let entry = crate::helpers::entry("dup", &[HookCategory::Startup]);
    let err = manager
        .register_hook(&entry, std::sync::Arc::new(RecordingHook::new("dup", &log)))
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(manager.registry().hook_count(HookCategory::Startup), 1);
}
