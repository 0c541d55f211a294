//! Unified outcome of a table operation.

use std::fmt;

use precompiled_ledger::TransactionReceipt;

/// Which plane an operation's outcome was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RetStatus {
    /// Executed by the ledger and accepted by the precompiled contract.
    Success,
    /// The ledger itself failed the transaction (out of gas, reverted, ...).
    LedgerRejected,
    /// The ledger executed the transaction but the contract returned a
    /// negative code.
    PrecompiledRejected,
    /// A receipt arrived but could not be interpreted.
    Undecodable,
    /// The call never produced a receipt (transport failure, RPC error, or
    /// a callback the ledger client dropped).
    CallFailed,
}

impl RetStatus {
    /// Returns a short name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::LedgerRejected => "ledger_rejected",
            Self::PrecompiledRejected => "precompiled_rejected",
            Self::Undecodable => "undecodable",
            Self::CallFailed => "call_failed",
        }
    }
}

impl fmt::Display for RetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a mutating operation, or the rejection of a read-only one.
///
/// A `RetCode` is always complete: it is only built by the receipt
/// interpreter and the async adapter, each of which fills every field for
/// its case. Success always carries the receipt. Failures decided from a
/// receipt carry it too; failures that never produced one do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetCode {
    status: RetStatus,
    code: i64,
    message: String,
    receipt: Option<TransactionReceipt>,
    affected_rows: Option<u64>,
}

impl RetCode {
    /// Code of a call that failed without an answer from the node.
    pub const CALL_FAILED: i64 = -1;
    /// Code of a receipt that could not be decoded.
    pub const DECODE_FAILED: i64 = -2;
    /// Code delivered when the ledger client dropped a callback unanswered.
    pub const CALLBACK_DROPPED: i64 = -3;

    pub(crate) fn success(receipt: TransactionReceipt, affected_rows: Option<u64>) -> Self {
        Self {
            status: RetStatus::Success,
            code: affected_rows.and_then(|n| i64::try_from(n).ok()).unwrap_or(0),
            message: "Success".to_owned(),
            receipt: Some(receipt),
            affected_rows,
        }
    }

    pub(crate) fn rejected(
        status: RetStatus,
        code: i64,
        message: impl Into<String>,
        receipt: Option<TransactionReceipt>,
    ) -> Self {
        Self { status, code, message: message.into(), receipt, affected_rows: None }
    }

    pub(crate) fn call_failed(code: i64, message: impl Into<String>) -> Self {
        Self::rejected(RetStatus::CallFailed, code, message, None)
    }

    /// Returns the plane the outcome was decided on.
    #[must_use]
    pub fn status(&self) -> RetStatus {
        self.status
    }

    /// Returns the numeric code.
    ///
    /// For success this is the affected row count (0 for `create_table`).
    /// For ledger rejections it is the receipt status, for contract
    /// rejections the contract's negative return code.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the receipt the outcome was decided from, if there was one.
    #[must_use]
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        self.receipt.as_ref()
    }

    /// Consumes the code, returning its receipt.
    #[must_use]
    pub fn into_receipt(self) -> Option<TransactionReceipt> {
        self.receipt
    }

    /// Returns the number of rows the contract reported as affected.
    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    /// Returns `true` for a successful outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RetStatus::Success
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {}, {})", self.message, self.code, self.status)
    }
}
