//! Integration tests of `MemoryLedger` through the proxy traits.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use precompiled_ledger::{
    CrudPrecompiled, LedgerError, LedgerStatus, MemoryLedger, PrecompiledCode, TableFactory,
    TransactionReceipt, abi::decode_int_word,
};
use rstest::rstest;
use tokio::sync::oneshot;

fn return_code(receipt: &TransactionReceipt) -> i64 {
    decode_int_word(&receipt.output).expect("valid return word")
}

fn submit_insert(
    ledger: &MemoryLedger,
    entry: &str,
) -> (Result<(), LedgerError>, oneshot::Receiver<Result<TransactionReceipt, LedgerError>>) {
    let (tx, rx) = oneshot::channel();
    let submitted = ledger.async_insert(
        "t",
        entry,
        "",
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    (submitted, rx)
}

#[tokio::test]
async fn proxies_work_through_trait_objects() {
    let ledger = MemoryLedger::new();
    let factory: Arc<dyn TableFactory> = Arc::new(ledger.clone());
    let crud: Arc<dyn CrudPrecompiled> = Arc::new(ledger.clone());

    let created = factory.create_table("t", "id", "v").await.unwrap();
    assert_eq!(return_code(&created), 0);

    let inserted = crud.insert("t", r#"{"id":"1","v":"a"}"#, "").await.unwrap();
    assert_eq!(return_code(&inserted), 1);

    assert_eq!(crud.desc("t").await.unwrap(), ("id".to_owned(), "v".to_owned()));
    assert_eq!(ledger.total_calls(), 3);
}

#[rstest]
#[case::not_json("nope", PrecompiledCode::PARSE_ENTRY_ERROR)]
#[case::unknown_field(r#"{"id":"1","x":"a"}"#, PrecompiledCode::TABLE_INVALID_FIELD)]
#[case::missing_key(r#"{"v":"a"}"#, PrecompiledCode::TABLE_INVALID_FIELD)]
#[case::non_string_value(r#"{"id":1}"#, PrecompiledCode::PARSE_ENTRY_ERROR)]
#[tokio::test]
async fn bad_entries_return_contract_codes(#[case] entry: &str, #[case] code: PrecompiledCode) {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();

    let receipt = ledger.insert("t", entry, "").await.unwrap();

    assert!(receipt.is_status_ok());
    assert_eq!(return_code(&receipt), code.0);
}

#[tokio::test]
async fn remove_returns_affected_row_count() {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();
    for id in ["1", "2", "3"] {
        ledger.insert("t", &format!(r#"{{"id":"{id}"}}"#), "").await.unwrap();
    }

    let receipt = ledger.remove("t", r#"{"id":{"ne":"2"}}"#, "").await.unwrap();

    assert_eq!(return_code(&receipt), 2);
    assert_eq!(ledger.rows("t").unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_field_is_rejected() {
    let ledger = MemoryLedger::new();
    let receipt = ledger.create_table("t", "id", "v,id").await.unwrap();
    assert_eq!(return_code(&receipt), PrecompiledCode::TABLE_DUPLICATE_FIELD.0);
}

#[tokio::test]
async fn override_replaces_receipt_without_executing() {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();
    let status = format!("{:#x}", LedgerStatus::PERMISSION_DENIED.0);
    ledger.override_next_receipt(status.clone(), "0x");

    let receipt = ledger.insert("t", r#"{"id":"1"}"#, "").await.unwrap();

    assert_eq!(receipt.status, status);
    assert!(!receipt.is_status_ok());
    assert!(ledger.rows("t").unwrap().is_empty());
}

#[tokio::test]
async fn call_fault_applies_once() {
    let ledger = MemoryLedger::new();
    ledger.fail_next_call(LedgerError::Shutdown);

    assert_eq!(ledger.create_table("t", "id", "v").await.unwrap_err(), LedgerError::Shutdown);
    assert!(ledger.create_table("t", "id", "v").await.is_ok());
    assert_eq!(ledger.call_count("createTable"), 2);
}

#[tokio::test]
async fn async_submission_fault_drops_callback() {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();
    ledger.fail_next_call(LedgerError::connection("down"));

    let (submitted, rx) = submit_insert(&ledger, r#"{"id":"1"}"#);

    assert!(submitted.is_err());
    assert!(rx.await.is_err(), "callback must be dropped uninvoked");
    assert!(ledger.rows("t").unwrap().is_empty());
}

#[tokio::test]
async fn async_receipt_fault_is_delivered() {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();
    ledger.fail_next_receipt(LedgerError::Timeout { duration_ms: 1 });

    let (submitted, rx) = submit_insert(&ledger, r#"{"id":"1"}"#);

    submitted.unwrap();
    assert_eq!(rx.await.unwrap(), Err(LedgerError::Timeout { duration_ms: 1 }));
}

#[tokio::test]
async fn dropped_callback_is_never_invoked() {
    let ledger = MemoryLedger::new();
    ledger.create_table("t", "id", "v").await.unwrap();
    ledger.drop_next_callback();

    let (submitted, rx) = submit_insert(&ledger, r#"{"id":"1"}"#);

    submitted.unwrap();
    assert!(rx.await.is_err());
    // the transaction itself still went through
    assert_eq!(ledger.rows("t").unwrap().len(), 1);
}

#[test]
fn async_submission_requires_runtime() {
    let ledger = MemoryLedger::new();
    let result = ledger.async_remove("t", "{}", "", Box::new(|_| {}));
    assert!(matches!(result, Err(LedgerError::Connection { .. })));
}
