//! End-to-end tests of `TableCrudService` over `MemoryLedger`.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use precompiled_crud::{
    Condition, CrudConfig, CrudError, EncodeError, Entry, LIMIT_FIELD, RetCode, RetStatus,
    TableCrudService,
};
use precompiled_ledger::{
    LedgerError, LedgerStatus, MemoryLedger, PrecompiledCode,
    abi::{encode_int_word, encode_revert_reason},
};
use proptest::prelude::*;
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn service() -> (TableCrudService, MemoryLedger) {
    let ledger = MemoryLedger::new();
    let service = TableCrudService::from_ledger(ledger.clone(), CrudConfig::default())
        .expect("default config is valid");
    (service, ledger)
}

fn person(name: &str, age: &str) -> Entry {
    Entry::new().with("name", name).with("age", age)
}

async fn people(service: &TableCrudService) {
    let ret = service.create_table("people", "name", &["age"]).await.expect("create");
    assert!(ret.is_success(), "{ret}");
    for (name, age) in [("a", "10"), ("b", "20")] {
        let ret = service.insert("people", &person(name, age)).await.expect("insert");
        assert!(ret.is_success(), "{ret}");
    }
}

// ---------------------------------------------------------------------------
// Key length
// ---------------------------------------------------------------------------

#[rstest]
#[case::at_max(255)]
#[case::short(1)]
#[tokio::test]
async fn key_within_limit_reaches_ledger(#[case] length: usize) {
    let (service, ledger) = service();
    let ret = service.create_table("t", &"k".repeat(length), &["v"]).await.unwrap();

    assert!(ret.is_success());
    assert_eq!(ledger.call_count("createTable"), 1);
}

#[tokio::test]
async fn key_over_limit_fails_without_network_call() {
    let (service, ledger) = service();
    let err = service.create_table("t", &"k".repeat(256), &["v"]).await.unwrap_err();

    assert!(matches!(err, CrudError::KeyTooLong { length: 256, max: 255, .. }));
    assert_eq!(err.code(), PrecompiledCode::TABLE_KEY_VALUE_LENGTH_OVERFLOW.0);
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn key_limit_follows_config() {
    let ledger = MemoryLedger::new();
    let config = CrudConfig::builder().max_key_length(4).build().unwrap();
    let service = TableCrudService::from_ledger(ledger.clone(), config).unwrap();

    assert!(service.create_table("t", "abcd", &["v"]).await.is_ok());
    assert!(matches!(
        service.create_table("u", "abcde", &["v"]).await,
        Err(CrudError::KeyTooLong { .. })
    ));
    assert_eq!(ledger.total_calls(), 1);
}

// ---------------------------------------------------------------------------
// Receipt planes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_table_success_attaches_receipt() {
    let (service, _) = service();
    let ret = service.create_table("t", "id", &["v"]).await.unwrap();

    assert_eq!(ret.status(), RetStatus::Success);
    assert_eq!(ret.code(), 0);
    assert!(ret.receipt().expect("receipt").is_status_ok());
}

#[tokio::test]
async fn create_existing_table_keeps_code_and_receipt() {
    let (service, _) = service();
    service.create_table("t", "id", &["v"]).await.unwrap();
    let ret = service.create_table("t", "id", &["v"]).await.unwrap();

    assert_eq!(ret.status(), RetStatus::PrecompiledRejected);
    assert_eq!(ret.code(), PrecompiledCode::TABLE_NAME_ALREADY_EXIST.0);
    assert_eq!(ret.message(), "The table already exists");
    let receipt = ret.receipt().expect("receipt stays attached");
    assert_eq!(receipt.output, encode_int_word(-50001));
}

#[tokio::test]
async fn ledger_level_failure_skips_return_word() {
    let (service, ledger) = service();
    service.create_table("t", "id", &["v"]).await.unwrap();
    ledger.override_next_receipt("0xc", encode_int_word(1));

    let ret = service.insert("t", &Entry::new().with("id", "1")).await.unwrap();

    assert_eq!(ret.status(), RetStatus::LedgerRejected);
    assert_eq!(ret.code(), LedgerStatus::OUT_OF_GAS.0);
    assert_eq!(ret.affected_rows(), None);
    assert!(ret.receipt().is_some());
    assert!(ledger.rows("t").unwrap().is_empty());
}

#[tokio::test]
async fn revert_reason_becomes_message() {
    let (service, ledger) = service();
    ledger.override_next_receipt("0x16", encode_revert_reason("row locked"));

    let ret = service.remove("t", None).await.unwrap();

    assert_eq!(ret.status(), RetStatus::LedgerRejected);
    assert_eq!(ret.message(), "row locked");
}

#[tokio::test]
async fn insert_into_missing_table() {
    let (service, _) = service();
    let ret = service.insert("missing", &person("a", "1")).await.unwrap();

    assert_eq!(ret.status(), RetStatus::PrecompiledRejected);
    assert_eq!(ret.code(), PrecompiledCode::TABLE_NOT_EXIST.0);
}

#[tokio::test]
async fn unknown_field_is_contract_failure() {
    let (service, _) = service();
    people(&service).await;

    let ret = service.insert("people", &person("c", "3").with("email", "x")).await.unwrap();
    assert_eq!(ret.code(), PrecompiledCode::TABLE_INVALID_FIELD.0);
}

#[tokio::test]
async fn transport_failure_is_call_failed_ret_code() {
    let (service, ledger) = service();
    ledger.fail_next_call(LedgerError::connection("refused"));

    let ret = service.create_table("t", "id", &["v"]).await.unwrap();

    assert_eq!(ret.status(), RetStatus::CallFailed);
    assert_eq!(ret.code(), RetCode::CALL_FAILED);
    assert!(ret.receipt().is_none());
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn select_decodes_rows_in_ledger_order() {
    let (service, _) = service();
    people(&service).await;

    let rows = service.select("people", None).await.unwrap();

    assert_eq!(rows, [person("a", "10"), person("b", "20")]);
    assert_eq!(rows[0].fields().collect::<Vec<_>>(), ["name", "age"]);
}

#[tokio::test]
async fn absent_and_empty_condition_send_identical_arguments() {
    let (service, ledger) = service();
    people(&service).await;

    let without = service.select("people", None).await.unwrap();
    let without_args = ledger.last_args("select").unwrap();
    let with = service.select("people", Some(&Condition::new())).await.unwrap();
    let with_args = ledger.last_args("select").unwrap();

    assert_eq!(without_args, with_args);
    assert_eq!(without_args[1], "{}");
    assert_eq!(without, with);
}

#[tokio::test]
async fn update_and_remove_report_affected_rows() {
    let (service, _) = service();
    people(&service).await;

    let mut older = Condition::new();
    older.gt("age", "15");
    let ret = service.update("people", &Entry::new().with("age", "21"), Some(&older)).await.unwrap();
    assert_eq!(ret.affected_rows(), Some(1));

    let rows = service.select("people", Some(&older)).await.unwrap();
    assert_eq!(rows, [person("b", "21")]);

    let ret = service.remove("people", None).await.unwrap();
    assert_eq!(ret.affected_rows(), Some(2));
    assert!(service.select("people", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn select_with_range_and_limit() {
    let (service, _) = service();
    people(&service).await;
    service.insert("people", &person("c", "30")).await.unwrap();
    service.insert("people", &person("d", "40")).await.unwrap();

    let mut window = Condition::new();
    window.ge("age", "20").le("age", "40").limit_offset(1, 2);
    let rows = service.select("people", Some(&window)).await.unwrap();

    assert_eq!(rows, [person("c", "30"), person("d", "40")]);
}

#[tokio::test]
async fn equality_filters_on_plain_condition() {
    let (service, _) = service();
    people(&service).await;

    let mut named = Condition::new();
    named.eq("name", "a");
    assert_eq!(service.select("people", Some(&named)).await.unwrap(), [person("a", "10")]);

    let mut others = Condition::new();
    others.ne("name", "a");
    let ret = service.remove("people", Some(&others)).await.unwrap();
    assert_eq!(ret.affected_rows(), Some(1));
    assert_eq!(service.select("people", None).await.unwrap(), [person("a", "10")]);
}

#[tokio::test]
async fn comparison_on_limit_column_fails_before_call() {
    let (service, ledger) = service();
    people(&service).await;
    let calls = ledger.total_calls();

    let mut clash = Condition::new();
    clash.eq(LIMIT_FIELD, "5");
    let err = service.select("people", Some(&clash)).await.unwrap_err();

    assert!(matches!(err, CrudError::Encoding { source: EncodeError::ReservedField(_), .. }));
    assert_eq!(ledger.total_calls(), calls);
}

// ---------------------------------------------------------------------------
// Read-only failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn select_missing_table_is_rejected_with_contract_code() {
    let (service, _) = service();
    let err = service.select("missing", None).await.unwrap_err();

    let CrudError::Rejected(ret) = err else { panic!("expected Rejected, got {err:?}") };
    assert_eq!(ret.status(), RetStatus::PrecompiledRejected);
    assert_eq!(ret.code(), PrecompiledCode::TABLE_NOT_EXIST.0);
}

#[tokio::test]
async fn desc_rpc_failure_is_rejected() {
    let (service, ledger) = service();
    ledger.fail_next_call(LedgerError::Rpc { code: -32000, message: "busy".into() });

    let err = service.desc("t").await.unwrap_err();

    let CrudError::Rejected(ret) = err else { panic!("expected Rejected, got {err:?}") };
    assert_eq!(ret.status(), RetStatus::CallFailed);
    assert!(ret.message().contains("busy"));
}

#[tokio::test]
async fn desc_returns_key_and_value_fields() {
    let (service, _) = service();
    service.create_table("t", "id", &["a", "b", "c"]).await.unwrap();

    let rows = service.desc("t").await.unwrap();

    assert_eq!(rows, [Entry::new().with("keyField", "id").with("valueFields", "a,b,c")]);
}

#[tokio::test]
async fn desc_is_not_cached() {
    let (service, ledger) = service();
    service.create_table("t", "id", &["a"]).await.unwrap();

    service.desc("t").await.unwrap();
    service.desc("t").await.unwrap();
    assert_eq!(ledger.call_count("desc"), 2);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Whatever gets inserted comes back from select field for field.
    #[test]
    fn inserted_rows_select_back(values in prop::collection::vec("[a-zA-Z0-9 ]{0,12}", 1..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let (service, _) = service();
            service.create_table("t", "id", &["v"]).await.unwrap();
            for (i, value) in values.iter().enumerate() {
                let entry = Entry::new().with("id", i.to_string()).with("v", value.as_str());
                service.insert("t", &entry).await.unwrap();
            }

            let rows = service.select("t", None).await.unwrap();
            assert_eq!(rows.len(), values.len());
            for (row, value) in rows.iter().zip(&values) {
                assert_eq!(row.get("v"), Some(value.as_str()));
            }
        });
    }

    /// A limit window returns exactly the rows that fall inside it.
    #[test]
    fn limit_window_size(rows in 0usize..8, offset in 0u32..10, count in 0u32..10) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let selected = runtime.block_on(async {
            let (service, _) = service();
            service.create_table("t", "id", &["v"]).await.unwrap();
            for i in 0..rows {
                service.insert("t", &Entry::new().with("id", i.to_string())).await.unwrap();
            }

            let mut window = Condition::new();
            window.limit_offset(offset, count);
            service.select("t", Some(&window)).await.unwrap()
        });

        let expected = rows.saturating_sub(offset as usize).min(count as usize);
        prop_assert_eq!(selected.len(), expected);
        if let Some(first) = selected.first() {
            let expected_id = offset.to_string();
            prop_assert_eq!(first.get("id"), Some(expected_id.as_str()));
        }
    }
}
