//! The CRUD service.

use std::{fmt, sync::Arc};

use fail::fail_point;
use precompiled_ledger::{
    CrudPrecompiled, LedgerError, LedgerResult, TableFactory, TransactionReceipt,
};

use crate::{
    Condition, CrudConfig, Entry, RetCode,
    callback::{CallbackAdapter, PendingRetCode},
    codec::{
        TableDescriptor, check_field_names, check_key_length, encode_condition, encode_entry,
        join_value_fields, parse_select_result,
    },
    error::{CrudError, Result},
    receipt_parser::{interpret_receipt, parse_call_error},
};

/// Relational-table operations over the table precompiled contracts.
///
/// The service holds no mutable state: it encodes arguments, calls the
/// proxies and interprets what comes back. It is cheap to clone and safe
/// to share between tasks.
///
/// # Outcomes
///
/// - Local validation and encoding failures return `Err` before any call is made.
/// - Mutating operations return `Ok(RetCode)` for every outcome the ledger decides, including
///   call-time failures and receipts that cannot be decoded.
/// - `select` and `desc` return `Err(CrudError::Rejected)` when the call fails, carrying the
///   [`RetCode`] a mutating call would have produced, and `Err(CrudError::Decode)` for a payload
///   that cannot be parsed.
///
/// Nothing is retried.
///
/// # Example
///
/// ```
/// use precompiled_crud::{Condition, CrudConfig, Entry, TableCrudService};
/// use precompiled_ledger::MemoryLedger;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = TableCrudService::from_ledger(MemoryLedger::new(), CrudConfig::default())?;
///
/// service.create_table("people", "name", &["age"]).await?;
/// service.insert("people", &Entry::new().with("name", "alice").with("age", "30")).await?;
///
/// let mut adults = Condition::new();
/// adults.ge("age", "18");
/// let rows = service.select("people", Some(&adults)).await?;
/// assert_eq!(rows[0].get("name"), Some("alice"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableCrudService {
    crud: Arc<dyn CrudPrecompiled>,
    table_factory: Arc<dyn TableFactory>,
    config: CrudConfig,
}

impl fmt::Debug for TableCrudService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCrudService").field("config", &self.config).finish_non_exhaustive()
    }
}

impl TableCrudService {
    /// Creates a service over separate proxies.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Config`] if `config` is invalid.
    pub fn new(
        crud: Arc<dyn CrudPrecompiled>,
        table_factory: Arc<dyn TableFactory>,
        config: CrudConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { crud, table_factory, config })
    }

    /// Creates a service over a client implementing both proxies.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Config`] if `config` is invalid.
    pub fn from_ledger<L>(ledger: L, config: CrudConfig) -> Result<Self>
    where
        L: CrudPrecompiled + TableFactory + 'static,
    {
        config.validate()?;
        Ok(Self::from_ledger_unchecked(ledger, config))
    }

    /// `config` must already be valid.
    pub(crate) fn from_ledger_unchecked<L>(ledger: L, config: CrudConfig) -> Self
    where
        L: CrudPrecompiled + TableFactory + 'static,
    {
        let ledger = Arc::new(ledger);
        Self { crud: Arc::clone(&ledger) as Arc<dyn CrudPrecompiled>, table_factory: ledger, config }
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    /// Creates a table.
    ///
    /// The key field is checked against the configured maximum length and
    /// all field names are validated before the call is made.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::KeyTooLong`] or [`CrudError::InvalidFieldName`]
    /// without contacting the ledger.
    #[tracing::instrument(skip(self, value_fields), fields(value_fields = value_fields.len()))]
    pub async fn create_table<S>(
        &self,
        table: &str,
        key_field: &str,
        value_fields: &[S],
    ) -> Result<RetCode>
    where
        S: AsRef<str> + Sync,
    {
        check_key_length(key_field, self.config.max_key_length())?;
        check_field_names(
            std::iter::once(key_field).chain(value_fields.iter().map(AsRef::as_ref)),
            self.config.strict_field_names(),
        )?;

        let joined = join_value_fields(value_fields);
        let result = self.table_factory.create_table(table, key_field, &joined).await;
        Ok(settle(table, result))
    }

    /// Inserts one row.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] if the row cannot be encoded.
    #[tracing::instrument(skip(self, entry), fields(fields = entry.len()))]
    pub async fn insert(&self, table: &str, entry: &Entry) -> Result<RetCode> {
        let entry = encode_row("insert", table, entry)?;
        let result = self.crud.insert(table, &entry, self.config.optional()).await;
        Ok(settle(table, result))
    }

    /// Updates the rows matching `condition` with the fields of `entry`.
    ///
    /// `None` matches every row.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] if the row or condition cannot be
    /// encoded.
    #[tracing::instrument(skip(self, entry, condition), fields(fields = entry.len()))]
    pub async fn update(
        &self,
        table: &str,
        entry: &Entry,
        condition: Option<&Condition>,
    ) -> Result<RetCode> {
        let entry = encode_row("update", table, entry)?;
        let condition = encode_filter(table, condition)?;
        let result = self.crud.update(table, &entry, &condition, self.config.optional()).await;
        Ok(settle(table, result))
    }

    /// Removes the rows matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] if the condition cannot be encoded.
    #[tracing::instrument(skip(self, condition))]
    pub async fn remove(&self, table: &str, condition: Option<&Condition>) -> Result<RetCode> {
        let condition = encode_filter(table, condition)?;
        let result = self.crud.remove(table, &condition, self.config.optional()).await;
        Ok(settle(table, result))
    }

    /// Returns the rows matching `condition`, in the order the ledger
    /// returned them.
    ///
    /// # Errors
    ///
    /// - [`CrudError::Encoding`] if the condition cannot be encoded.
    /// - [`CrudError::Rejected`] if the call fails.
    /// - [`CrudError::Decode`] if the result payload is malformed.
    #[tracing::instrument(skip(self, condition))]
    pub async fn select(&self, table: &str, condition: Option<&Condition>) -> Result<Vec<Entry>> {
        let condition = encode_filter(table, condition)?;
        let raw = self
            .crud
            .select(table, &condition, self.config.optional())
            .await
            .map_err(|err| read_rejected(table, &err))?;

        let rows = parse_select_result(table, &raw).inspect_err(|err| {
            tracing::warn!(table, error = %err, "Select result could not be decoded");
        })?;
        tracing::debug!(table, rows = rows.len(), "Select completed");
        Ok(rows)
    }

    /// Returns the table schema as a single row with `keyField` and
    /// `valueFields`.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Rejected`] if the call fails.
    #[tracing::instrument(skip(self))]
    pub async fn desc(&self, table: &str) -> Result<Vec<Entry>> {
        Ok(self.describe(table).await?.to_entries())
    }

    /// Returns the table schema. Each call queries the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Rejected`] if the call fails.
    #[tracing::instrument(skip(self))]
    pub async fn table_descriptor(&self, table: &str) -> Result<TableDescriptor> {
        self.describe(table).await
    }

    async fn describe(&self, table: &str) -> Result<TableDescriptor> {
        let (key_field, value_fields) =
            self.crud.desc(table).await.map_err(|err| read_rejected(table, &err))?;
        Ok(TableDescriptor::from_wire(key_field, &value_fields))
    }

    /// Submits an insert and returns once the ledger client has accepted
    /// it. `handler` is invoked exactly once with the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] if the row cannot be encoded, or
    /// [`CrudError::Rejected`] if the submission is refused. In both cases
    /// `handler` is never invoked.
    #[tracing::instrument(skip(self, entry, handler), fields(fields = entry.len()))]
    pub fn async_insert<F>(&self, table: &str, entry: &Entry, handler: F) -> Result<()>
    where
        F: FnOnce(RetCode) + Send + 'static,
    {
        let entry = encode_row("insert", table, entry)?;
        injected_submit_failure()?;

        let adapter = CallbackAdapter::new(table, Box::new(handler));
        let result = self.crud.async_insert(
            table,
            &entry,
            self.config.optional(),
            adapter.transaction_callback(),
        );
        adapter.submitted(result)
    }

    /// Submits an update. See [`async_insert`](Self::async_insert).
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] or [`CrudError::Rejected`] without
    /// invoking `handler`.
    #[tracing::instrument(skip(self, entry, condition, handler), fields(fields = entry.len()))]
    pub fn async_update<F>(
        &self,
        table: &str,
        entry: &Entry,
        condition: Option<&Condition>,
        handler: F,
    ) -> Result<()>
    where
        F: FnOnce(RetCode) + Send + 'static,
    {
        let entry = encode_row("update", table, entry)?;
        let condition = encode_filter(table, condition)?;
        injected_submit_failure()?;

        let adapter = CallbackAdapter::new(table, Box::new(handler));
        let result = self.crud.async_update(
            table,
            &entry,
            &condition,
            self.config.optional(),
            adapter.transaction_callback(),
        );
        adapter.submitted(result)
    }

    /// Submits a remove. See [`async_insert`](Self::async_insert).
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Encoding`] or [`CrudError::Rejected`] without
    /// invoking `handler`.
    #[tracing::instrument(skip(self, condition, handler))]
    pub fn async_remove<F>(
        &self,
        table: &str,
        condition: Option<&Condition>,
        handler: F,
    ) -> Result<()>
    where
        F: FnOnce(RetCode) + Send + 'static,
    {
        let condition = encode_filter(table, condition)?;
        injected_submit_failure()?;

        let adapter = CallbackAdapter::new(table, Box::new(handler));
        let result = self.crud.async_remove(
            table,
            &condition,
            self.config.optional(),
            adapter.transaction_callback(),
        );
        adapter.submitted(result)
    }

    /// Submits an insert and returns a future for its outcome.
    ///
    /// # Errors
    ///
    /// Same as [`async_insert`](Self::async_insert).
    pub fn submit_insert(&self, table: &str, entry: &Entry) -> Result<PendingRetCode> {
        let (handler, pending) = PendingRetCode::channel();
        self.async_insert(table, entry, handler)?;
        Ok(pending)
    }

    /// Submits an update and returns a future for its outcome.
    ///
    /// # Errors
    ///
    /// Same as [`async_update`](Self::async_update).
    pub fn submit_update(
        &self,
        table: &str,
        entry: &Entry,
        condition: Option<&Condition>,
    ) -> Result<PendingRetCode> {
        let (handler, pending) = PendingRetCode::channel();
        self.async_update(table, entry, condition, handler)?;
        Ok(pending)
    }

    /// Submits a remove and returns a future for its outcome.
    ///
    /// # Errors
    ///
    /// Same as [`async_remove`](Self::async_remove).
    pub fn submit_remove(
        &self,
        table: &str,
        condition: Option<&Condition>,
    ) -> Result<PendingRetCode> {
        let (handler, pending) = PendingRetCode::channel();
        self.async_remove(table, condition, handler)?;
        Ok(pending)
    }
}

fn encode_row(op: &str, table: &str, entry: &Entry) -> Result<String> {
    encode_entry(entry).map_err(|source| CrudError::Encoding {
        message: format!("{op} {entry} to {table} failed"),
        source,
    })
}

fn encode_filter(table: &str, condition: Option<&Condition>) -> Result<String> {
    encode_condition(condition).map_err(|source| CrudError::Encoding {
        message: format!("encode condition for {table} failed"),
        source,
    })
}

/// Turns a mutating call's result into its outcome.
fn settle(table: &str, result: LedgerResult<TransactionReceipt>) -> RetCode {
    let ret = match result {
        Ok(receipt) => interpret_receipt(table, receipt),
        Err(err) => parse_call_error(&err),
    };
    if ret.is_success() {
        tracing::debug!(table, code = ret.code(), "Operation succeeded");
    } else {
        tracing::warn!(
            table,
            status = %ret.status(),
            code = ret.code(),
            message = ret.message(),
            "Operation failed"
        );
    }
    ret
}

fn read_rejected(table: &str, err: &LedgerError) -> CrudError {
    let ret = parse_call_error(err);
    tracing::warn!(table, status = %ret.status(), code = ret.code(), "Query rejected");
    CrudError::Rejected(ret)
}

fn injected_submit_failure() -> Result<()> {
    fail_point!("crud-async-submit", |_| {
        Err(CrudError::Rejected(parse_call_error(&LedgerError::connection(
            "injected failure before submission",
        ))))
    });
    Ok(())
}
