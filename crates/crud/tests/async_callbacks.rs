//! Tests of the callback-driven operations.
//!
//! Every handler here reports into an unbounded channel whose only sender
//! it owns. One `Some` followed by `None` from the receiver proves the
//! handler ran exactly once and was then dropped.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use precompiled_crud::{
    Condition, CrudConfig, CrudError, Entry, RetCode, RetStatus, TableCrudService,
};
use precompiled_ledger::{LedgerError, MemoryLedger, PrecompiledCode};
use tokio::{sync::mpsc, task::JoinSet};

const CONCURRENCY: usize = 32;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn setup() -> (TableCrudService, MemoryLedger) {
    let ledger = MemoryLedger::new();
    let service = TableCrudService::from_ledger(ledger.clone(), CrudConfig::default())
        .expect("default config is valid");
    service.create_table("t", "id", &["v"]).await.expect("create table");
    (service, ledger)
}

fn recorder() -> (impl FnOnce(RetCode) + Send + 'static, mpsc::UnboundedReceiver<RetCode>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |ret: RetCode| {
        tx.send(ret).expect("receiver alive");
    };
    (handler, rx)
}

/// Waits for the single delivery and checks no second one can follow.
async fn exactly_once(mut rx: mpsc::UnboundedReceiver<RetCode>) -> RetCode {
    let ret = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("handler invoked in time")
        .expect("handler delivered a RetCode");
    let after = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("handler dropped in time");
    assert!(after.is_none(), "handler delivered twice");
    ret
}

fn row(id: &str) -> Entry {
    Entry::new().with("id", id).with("v", "x")
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn async_insert_delivers_success_once() {
    let (service, ledger) = setup().await;
    let (handler, rx) = recorder();

    service.async_insert("t", &row("1"), handler).unwrap();
    let ret = exactly_once(rx).await;

    assert!(ret.is_success(), "{ret}");
    assert_eq!(ret.affected_rows(), Some(1));
    assert!(ret.receipt().is_some());
    assert_eq!(ledger.rows("t").unwrap().len(), 1);
}

#[tokio::test]
async fn async_update_and_remove_deliver_counts() {
    let (service, _) = setup().await;
    for id in ["1", "2", "3"] {
        service.insert("t", &row(id)).await.unwrap();
    }

    let mut some = Condition::new();
    some.ne("id", "2");
    let (handler, rx) = recorder();
    service.async_update("t", &Entry::new().with("v", "y"), Some(&some), handler).unwrap();
    assert_eq!(exactly_once(rx).await.affected_rows(), Some(2));

    let (handler, rx) = recorder();
    service.async_remove("t", None, handler).unwrap();
    assert_eq!(exactly_once(rx).await.affected_rows(), Some(3));
}

#[tokio::test]
async fn contract_failure_reaches_handler_with_receipt() {
    let (service, _) = setup().await;
    let (handler, rx) = recorder();

    service.async_insert("missing", &row("1"), handler).unwrap();
    let ret = exactly_once(rx).await;

    assert_eq!(ret.status(), RetStatus::PrecompiledRejected);
    assert_eq!(ret.code(), PrecompiledCode::TABLE_NOT_EXIST.0);
    assert!(ret.receipt().is_some());
}

#[tokio::test]
async fn undecodable_receipt_becomes_failure_ret_code() {
    let (service, ledger) = setup().await;
    ledger.override_next_receipt("0x0", "0xnot-hex");
    let (handler, rx) = recorder();

    service.async_insert("t", &row("1"), handler).unwrap();
    let ret = exactly_once(rx).await;

    assert_eq!(ret.status(), RetStatus::Undecodable);
    assert_eq!(ret.code(), RetCode::DECODE_FAILED);
    assert_eq!(ret.receipt().expect("raw receipt kept").output, "0xnot-hex");
}

#[tokio::test]
async fn error_after_submission_reaches_handler() {
    let (service, ledger) = setup().await;
    ledger.fail_next_receipt(LedgerError::Timeout { duration_ms: 30_000 });
    let (handler, rx) = recorder();

    service.async_remove("t", None, handler).unwrap();
    let ret = exactly_once(rx).await;

    assert_eq!(ret.status(), RetStatus::CallFailed);
    assert!(ret.message().contains("30000ms"));
}

#[tokio::test]
async fn dropped_callback_still_invokes_handler() {
    let (service, ledger) = setup().await;
    ledger.drop_next_callback();
    let (handler, rx) = recorder();

    service.async_insert("t", &row("1"), handler).unwrap();
    let ret = exactly_once(rx).await;

    assert_eq!(ret.status(), RetStatus::CallFailed);
    assert_eq!(ret.code(), RetCode::CALLBACK_DROPPED);
}

// ---------------------------------------------------------------------------
// Synchronous failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submission_failure_returns_error_and_skips_handler() {
    let (service, ledger) = setup().await;
    ledger.fail_next_call(LedgerError::connection("node unreachable"));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let err = service
        .async_insert("t", &row("1"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap_err();

    let CrudError::Rejected(ret) = err else { panic!("expected Rejected, got {err:?}") };
    assert_eq!(ret.status(), RetStatus::CallFailed);
    assert!(ret.message().contains("node unreachable"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn encoding_failure_returns_error_before_submission() {
    let (service, ledger) = setup().await;
    let calls_before = ledger.total_calls();
    let (handler, mut rx) = recorder();

    let err = service.async_insert("t", &Entry::new().with("", "x"), handler).unwrap_err();

    assert!(matches!(err, CrudError::Encoding { .. }));
    assert_eq!(ledger.total_calls(), calls_before);
    assert!(rx.recv().await.is_none(), "handler must be dropped uninvoked");
}

// ---------------------------------------------------------------------------
// Futures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_operations_resolve() {
    let (service, _) = setup().await;

    let inserted = service.submit_insert("t", &row("1")).unwrap().await;
    assert!(inserted.is_success());

    let mut one = Condition::new();
    one.eq("id", "1");
    let updated = service.submit_update("t", &row("1"), Some(&one)).unwrap().await;
    assert_eq!(updated.affected_rows(), Some(1));

    let removed = service.submit_remove("t", Some(&one)).unwrap().await;
    assert_eq!(removed.affected_rows(), Some(1));
}

#[tokio::test]
async fn submit_resolves_when_callback_dropped() {
    let (service, ledger) = setup().await;
    ledger.drop_next_callback();

    let ret = service.submit_insert("t", &row("1")).unwrap().await;
    assert_eq!(ret.code(), RetCode::CALLBACK_DROPPED);
}

#[tokio::test]
async fn submit_failure_is_synchronous() {
    let (service, ledger) = setup().await;
    ledger.fail_next_call(LedgerError::Shutdown);

    assert!(matches!(service.submit_remove("t", None), Err(CrudError::Rejected(_))));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_each_deliver_once() {
    let (service, ledger) = setup().await;
    let delivered = Arc::new(AtomicUsize::new(0));

    let mut set = JoinSet::new();
    for i in 0..CONCURRENCY {
        let service = service.clone();
        let delivered = Arc::clone(&delivered);
        set.spawn(async move {
            let (handler, rx) = recorder();
            service.async_insert("t", &row(&i.to_string()), handler).expect("submit");
            let ret = exactly_once(rx).await;
            assert!(ret.is_success(), "{ret}");
            delivered.fetch_add(1, Ordering::SeqCst);
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    assert_eq!(delivered.load(Ordering::SeqCst), CONCURRENCY);
    assert_eq!(ledger.rows("t").unwrap().len(), CONCURRENCY);
}
