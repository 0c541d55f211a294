//! In-memory ledger implementing the table precompiled contracts.
//!
//! [`MemoryLedger`] stands in for a real node in tests and during
//! development. It executes table calls against in-process tables and
//! answers with receipts shaped exactly like the node's: a `"0x0"` status
//! plus an `int256` return word, negative on application-level failure.
//!
//! # Features
//!
//! - **Both proxies**: implements [`TableFactory`] and [`CrudPrecompiled`]
//! - **Condition evaluation**: `eq`, `ne`, `gt`, `ge`, `lt`, `le` and `limit`, comparing
//!   numerically when both sides parse as integers
//! - **Call recording**: every proxy call is recorded with its wire arguments
//! - **Fault injection**: fail the next call, fail the next delivered receipt, override the next
//!   receipt's status and output, or drop the next callback unanswered
//!
//! # Async delivery
//!
//! The `async_*` methods hand the callback to a spawned tokio task, so a
//! callback never runs on the submitting stack. They must be called from
//! within a tokio runtime.

use std::{
    cmp::Ordering,
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};

use async_trait::async_trait;
use fail::fail_point;
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::{
    LedgerError, LedgerResult, PrecompiledCode, TransactionCallback, TransactionReceipt,
    abi::encode_int_word,
    proxy::{CrudPrecompiled, TableFactory},
    receipt::STATUS_OK,
};

const TABLE_FACTORY_ADDRESS: &str = "0x0000000000000000000000000000000000001001";
const CRUD_ADDRESS: &str = "0x0000000000000000000000000000000000001002";
const SENDER_ADDRESS: &str = "0x00000000000000000000000000000000000000aa";
const CONDITION_LIMIT_KEY: &str = "limit";

/// A proxy call as the ledger received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Contract function name (`createTable`, `insert`, `select`, ...).
    pub function: &'static str,
    /// Wire arguments in call order.
    pub args: Vec<String>,
    /// Whether the call came through an `async_*` method.
    pub is_async: bool,
}

#[derive(Debug, Clone)]
struct Table {
    key_field: String,
    value_fields: Vec<String>,
    rows: Vec<Vec<(String, String)>>,
}

impl Table {
    fn columns(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.key_field).chain(self.value_fields.iter())
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns().any(|c| c == name)
    }
}

#[derive(Default)]
struct Faults {
    next_call: VecDeque<LedgerError>,
    next_receipt: VecDeque<LedgerError>,
    next_output: VecDeque<(String, String)>,
    drop_callbacks: usize,
}

/// A mutating call after argument decoding.
enum Mutation<'a> {
    CreateTable { table: &'a str, key_field: &'a str, value_fields: &'a str },
    Insert { table: &'a str, entry: &'a str },
    Update { table: &'a str, entry: &'a str, condition: &'a str },
    Remove { table: &'a str, condition: &'a str },
}

/// In-memory ledger for the table precompiled contracts.
///
/// `MemoryLedger` is cheaply cloneable via [`Arc`]. All clones share the
/// same tables, call log and fault queue.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    faults: Arc<Mutex<Faults>>,
    block_number: Arc<AtomicU64>,
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("tables", &self.tables.read().len())
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call received so far, oldest first.
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls received for `function`.
    #[must_use]
    pub fn call_count(&self, function: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.function == function).count()
    }

    /// Returns the total number of calls received.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the arguments of the most recent call to `function`.
    #[must_use]
    pub fn last_args(&self, function: &str) -> Option<Vec<String>> {
        self.calls.lock().iter().rev().find(|c| c.function == function).map(|c| c.args.clone())
    }

    /// Makes the next proxy call fail with `err` before anything is
    /// executed. For `async_*` calls this is a submission failure.
    pub fn fail_next_call(&self, err: LedgerError) {
        self.faults.lock().next_call.push_back(err);
    }

    /// Makes the next `async_*` call accept the submission and then deliver
    /// `err` to its callback instead of a receipt.
    pub fn fail_next_receipt(&self, err: LedgerError) {
        self.faults.lock().next_receipt.push_back(err);
    }

    /// Replaces the status and output of the next mutating receipt. The
    /// call is recorded but not executed.
    pub fn override_next_receipt(&self, status: impl Into<String>, output: impl Into<String>) {
        self.faults.lock().next_output.push_back((status.into(), output.into()));
    }

    /// Makes the next `async_*` call accept the submission and then drop its
    /// callback without invoking it.
    pub fn drop_next_callback(&self) {
        self.faults.lock().drop_callbacks += 1;
    }

    /// Returns the rows of `table` in insertion order, or `None` if the
    /// table does not exist.
    #[must_use]
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<(String, String)>>> {
        self.tables.read().get(table).map(|t| t.rows.clone())
    }

    fn record(&self, function: &'static str, args: &[&str], is_async: bool) {
        self.calls.lock().push(RecordedCall {
            function,
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            is_async,
        });
    }

    fn take_call_fault(&self) -> Option<LedgerError> {
        self.faults.lock().next_call.pop_front()
    }

    fn receipt(&self, to: &str, status: String, output: String) -> TransactionReceipt {
        let height = self.block_number.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        TransactionReceipt {
            transaction_hash: format!("0x{height:064x}"),
            block_number: format!("{height:#x}"),
            from: SENDER_ADDRESS.to_owned(),
            to: to.to_owned(),
            gas_used: "0x5208".to_owned(),
            status,
            output,
            message: None,
            logs: Vec::new(),
        }
    }

    /// Executes a mutating call and produces its receipt.
    fn execute(&self, mutation: Mutation<'_>) -> LedgerResult<TransactionReceipt> {
        fail_point!("memory-ledger-execute", |_| {
            Err(LedgerError::connection("injected failure before execution"))
        });

        let to = match mutation {
            Mutation::CreateTable { .. } => TABLE_FACTORY_ADDRESS,
            _ => CRUD_ADDRESS,
        };

        if let Some((status, output)) = self.faults.lock().next_output.pop_front() {
            return Ok(self.receipt(to, status, output));
        }

        let code = match self.apply(mutation) {
            Ok(affected) => affected,
            Err(code) => code.0,
        };
        Ok(self.receipt(to, STATUS_OK.to_owned(), encode_int_word(code)))
    }

    fn apply(&self, mutation: Mutation<'_>) -> Result<i64, PrecompiledCode> {
        let mut tables = self.tables.write();
        match mutation {
            Mutation::CreateTable { table, key_field, value_fields } => {
                if tables.contains_key(table) {
                    return Err(PrecompiledCode::TABLE_NAME_ALREADY_EXIST);
                }
                let value_fields: Vec<String> = value_fields
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_owned)
                    .collect();
                let mut seen = vec![key_field];
                for field in &value_fields {
                    if seen.contains(&field.as_str()) {
                        return Err(PrecompiledCode::TABLE_DUPLICATE_FIELD);
                    }
                    seen.push(field.as_str());
                }
                tables.insert(
                    table.to_owned(),
                    Table { key_field: key_field.to_owned(), value_fields, rows: Vec::new() },
                );
                Ok(0)
            },
            Mutation::Insert { table, entry } => {
                let table = tables.get_mut(table).ok_or(PrecompiledCode::TABLE_NOT_EXIST)?;
                let fields = parse_entry(entry)?;
                if fields.iter().any(|(name, _)| !table.has_column(name))
                    || !fields.iter().any(|(name, _)| *name == table.key_field)
                {
                    return Err(PrecompiledCode::TABLE_INVALID_FIELD);
                }
                let row = table
                    .columns()
                    .map(|column| {
                        let value = fields
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default();
                        (column.clone(), value)
                    })
                    .collect();
                table.rows.push(row);
                Ok(1)
            },
            Mutation::Update { table, entry, condition } => {
                let table = tables.get_mut(table).ok_or(PrecompiledCode::TABLE_NOT_EXIST)?;
                let fields = parse_entry(entry)?;
                if fields.iter().any(|(name, _)| !table.has_column(name)) {
                    return Err(PrecompiledCode::TABLE_INVALID_FIELD);
                }
                let filter = Filter::parse(condition)?;
                let mut affected = 0;
                for index in filter.matching(&table.rows) {
                    for (column, value) in table.rows[index].iter_mut() {
                        if let Some((_, new_value)) = fields.iter().find(|(name, _)| name == column)
                        {
                            value.clone_from(new_value);
                        }
                    }
                    affected += 1;
                }
                Ok(affected)
            },
            Mutation::Remove { table, condition } => {
                let table = tables.get_mut(table).ok_or(PrecompiledCode::TABLE_NOT_EXIST)?;
                let filter = Filter::parse(condition)?;
                let doomed = filter.matching(&table.rows);
                let affected = i64::try_from(doomed.len()).unwrap_or(i64::MAX);
                let mut index = 0;
                table.rows.retain(|_| {
                    let keep = !doomed.contains(&index);
                    index += 1;
                    keep
                });
                Ok(affected)
            },
        }
    }

    /// Routes an async submission: executes it now and delivers the outcome
    /// from a spawned task.
    fn submit(&self, mutation: Mutation<'_>, callback: TransactionCallback) -> LedgerResult<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| LedgerError::connection("no tokio runtime to deliver receipts on"))?;

        let (receipt_fault, drop_callback) = {
            let mut faults = self.faults.lock();
            let drop_callback = faults.drop_callbacks > 0;
            if drop_callback {
                faults.drop_callbacks -= 1;
            }
            (faults.next_receipt.pop_front(), drop_callback)
        };

        let outcome = match receipt_fault {
            Some(err) => Err(err),
            None => self.execute(mutation),
        };

        handle.spawn(async move {
            if drop_callback {
                tracing::debug!("dropping transaction callback without a response");
                drop(callback);
                return;
            }
            callback(outcome);
        });
        Ok(())
    }

    fn read_failure(code: PrecompiledCode) -> LedgerError {
        LedgerError::call_failed(STATUS_OK, encode_int_word(code.0), code.to_string())
    }
}

#[async_trait]
impl TableFactory for MemoryLedger {
    async fn create_table(
        &self,
        table_name: &str,
        key_field: &str,
        value_fields: &str,
    ) -> LedgerResult<TransactionReceipt> {
        self.record("createTable", &[table_name, key_field, value_fields], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.execute(Mutation::CreateTable { table: table_name, key_field, value_fields })
    }
}

#[async_trait]
impl CrudPrecompiled for MemoryLedger {
    async fn insert(
        &self,
        table_name: &str,
        entry: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt> {
        self.record("insert", &[table_name, entry, optional], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.execute(Mutation::Insert { table: table_name, entry })
    }

    async fn update(
        &self,
        table_name: &str,
        entry: &str,
        condition: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt> {
        self.record("update", &[table_name, entry, condition, optional], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.execute(Mutation::Update { table: table_name, entry, condition })
    }

    async fn remove(
        &self,
        table_name: &str,
        condition: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt> {
        self.record("remove", &[table_name, condition, optional], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.execute(Mutation::Remove { table: table_name, condition })
    }

    async fn select(
        &self,
        table_name: &str,
        condition: &str,
        optional: &str,
    ) -> LedgerResult<String> {
        self.record("select", &[table_name, condition, optional], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }

        let tables = self.tables.read();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Self::read_failure(PrecompiledCode::TABLE_NOT_EXIST))?;
        let filter = Filter::parse(condition).map_err(Self::read_failure)?;
        let rows: Vec<OrderedRow<'_>> =
            filter.matching(&table.rows).into_iter().map(|i| OrderedRow(&table.rows[i])).collect();

        serde_json::to_string(&rows)
            .map_err(|e| LedgerError::call_failed(STATUS_OK, "0x", e.to_string()))
    }

    async fn desc(&self, table_name: &str) -> LedgerResult<(String, String)> {
        self.record("desc", &[table_name], false);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }

        let tables = self.tables.read();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Self::read_failure(PrecompiledCode::TABLE_NOT_EXIST))?;
        Ok((table.key_field.clone(), table.value_fields.join(",")))
    }

    fn async_insert(
        &self,
        table_name: &str,
        entry: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()> {
        self.record("insert", &[table_name, entry, optional], true);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.submit(Mutation::Insert { table: table_name, entry }, callback)
    }

    fn async_update(
        &self,
        table_name: &str,
        entry: &str,
        condition: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()> {
        self.record("update", &[table_name, entry, condition, optional], true);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.submit(Mutation::Update { table: table_name, entry, condition }, callback)
    }

    fn async_remove(
        &self,
        table_name: &str,
        condition: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()> {
        self.record("remove", &[table_name, condition, optional], true);
        if let Some(err) = self.take_call_fault() {
            return Err(err);
        }
        self.submit(Mutation::Remove { table: table_name, condition }, callback)
    }
}

/// Serializes a stored row as a JSON object in column order.
struct OrderedRow<'a>(&'a [(String, String)]);

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn parse_entry(entry: &str) -> Result<Vec<(String, String)>, PrecompiledCode> {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(entry) else {
        return Err(PrecompiledCode::PARSE_ENTRY_ERROR);
    };
    fields
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            _ => Err(PrecompiledCode::PARSE_ENTRY_ERROR),
        })
        .collect()
}

/// A decoded condition argument.
#[derive(Debug, Default)]
struct Filter {
    clauses: Vec<(String, String, String)>,
    offset: usize,
    count: Option<usize>,
}

impl Filter {
    fn parse(condition: &str) -> Result<Self, PrecompiledCode> {
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(condition) else {
            return Err(PrecompiledCode::PARSE_CONDITION_ERROR);
        };

        let mut filter = Self::default();
        for (field, ops) in fields {
            let Value::Object(ops) = ops else {
                return Err(PrecompiledCode::PARSE_CONDITION_ERROR);
            };
            for (op, value) in ops {
                let Value::String(value) = value else {
                    return Err(PrecompiledCode::PARSE_CONDITION_ERROR);
                };
                if field == CONDITION_LIMIT_KEY && op == CONDITION_LIMIT_KEY {
                    let (offset, count) =
                        value.split_once(',').ok_or(PrecompiledCode::PARSE_CONDITION_ERROR)?;
                    filter.offset = offset
                        .trim()
                        .parse()
                        .map_err(|_| PrecompiledCode::PARSE_CONDITION_ERROR)?;
                    filter.count = Some(
                        count.trim().parse().map_err(|_| PrecompiledCode::PARSE_CONDITION_ERROR)?,
                    );
                    continue;
                }
                if !matches!(op.as_str(), "eq" | "ne" | "gt" | "ge" | "lt" | "le") {
                    return Err(PrecompiledCode::CONDITION_OPERATION_UNDEFINED);
                }
                filter.clauses.push((field.clone(), op, value));
            }
        }
        Ok(filter)
    }

    /// Returns the indexes of matching rows after applying the limit.
    fn matching(&self, rows: &[Vec<(String, String)>]) -> Vec<usize> {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| self.clauses.iter().all(|clause| clause_matches(row, clause)))
            .map(|(i, _)| i)
            .skip(self.offset)
            .take(self.count.unwrap_or(usize::MAX))
            .collect()
    }
}

fn clause_matches(row: &[(String, String)], (field, op, expected): &(String, String, String)) -> bool {
    let Some((_, actual)) = row.iter().find(|(name, _)| name == field) else {
        return false;
    };
    let ordering = match (actual.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.as_str().cmp(expected.as_str()),
    };
    match op.as_str() {
        "eq" => ordering == Ordering::Equal,
        "ne" => ordering != Ordering::Equal,
        "gt" => ordering == Ordering::Greater,
        "ge" => ordering != Ordering::Less,
        "lt" => ordering == Ordering::Less,
        "le" => ordering != Ordering::Greater,
        _ => false,
    }
}
