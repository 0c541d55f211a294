//! Proxies for the table precompiled contracts.
//!
//! These traits are the narrow seam between the CRUD layer and whatever
//! ledger client actually signs, submits and waits for transactions. All
//! arguments are already wire-encoded strings; the proxy does no encoding
//! of its own.
//!
//! # Completion model
//!
//! Mutating calls come in two shapes:
//!
//! - `async fn insert(..) -> LedgerResult<TransactionReceipt>`: resolves once the ledger has
//!   produced a receipt or the call failed.
//! - `fn async_insert(.., callback) -> LedgerResult<()>`: returns as soon as the transaction has
//!   been handed to the client. An `Err` here means nothing was submitted and the callback is
//!   dropped unused. On `Ok`, the client owns the callback and invokes it at most once, from a
//!   context of its choosing (I/O thread, pool, event loop), with either the receipt or the error
//!   that ended the wait.

use async_trait::async_trait;

use crate::{LedgerResult, TransactionReceipt};

/// Completion handler a ledger client invokes when a submitted
/// transaction finishes.
pub type TransactionCallback = Box<dyn FnOnce(LedgerResult<TransactionReceipt>) + Send + 'static>;

/// Proxy for the table factory precompiled contract.
#[async_trait]
pub trait TableFactory: Send + Sync {
    /// Creates a table with the given key field and comma-joined value
    /// fields.
    async fn create_table(
        &self,
        table_name: &str,
        key_field: &str,
        value_fields: &str,
    ) -> LedgerResult<TransactionReceipt>;
}

/// Proxy for the CRUD precompiled contract.
///
/// `entry` and `condition` arguments are JSON objects as produced by the
/// CRUD layer's codec. `optional` is the contract's trailing free-form
/// argument, normally empty.
#[async_trait]
pub trait CrudPrecompiled: Send + Sync {
    /// Inserts one row.
    async fn insert(
        &self,
        table_name: &str,
        entry: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt>;

    /// Updates the rows matching `condition` with the fields in `entry`.
    async fn update(
        &self,
        table_name: &str,
        entry: &str,
        condition: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt>;

    /// Removes the rows matching `condition`.
    async fn remove(
        &self,
        table_name: &str,
        condition: &str,
        optional: &str,
    ) -> LedgerResult<TransactionReceipt>;

    /// Queries the rows matching `condition`.
    ///
    /// Returns the raw JSON array of row objects.
    async fn select(&self, table_name: &str, condition: &str, optional: &str)
    -> LedgerResult<String>;

    /// Queries a table's schema as `(key_field, comma-joined value fields)`.
    async fn desc(&self, table_name: &str) -> LedgerResult<(String, String)>;

    /// Submits an insert without waiting for the receipt.
    fn async_insert(
        &self,
        table_name: &str,
        entry: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()>;

    /// Submits an update without waiting for the receipt.
    fn async_update(
        &self,
        table_name: &str,
        entry: &str,
        condition: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()>;

    /// Submits a remove without waiting for the receipt.
    fn async_remove(
        &self,
        table_name: &str,
        condition: &str,
        optional: &str,
        callback: TransactionCallback,
    ) -> LedgerResult<()>;
}
