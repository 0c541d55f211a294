//! Error types for the ledger client surface.
//!
//! [`LedgerError`] is what a precompiled contract proxy returns when a call
//! fails before (or instead of) producing a transaction receipt. Callers in
//! the CRUD layer re-interpret these errors through the same receipt parser
//! they use for receipts, so a [`LedgerError::CallFailed`] keeps the raw
//! status and output the node answered with.

use thiserror::Error;

/// Result type alias for ledger client operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors raised by the ledger client while submitting a transaction or
/// querying a contract.
///
/// # Non-exhaustive
///
/// New transport failure kinds may be added without a semver-breaking
/// change. Downstream match expressions must include a wildcard arm.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The node could not be reached or the connection broke mid-call.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The call did not complete within the client's timeout.
    #[error("Ledger call timed out after {duration_ms}ms")]
    Timeout {
        /// How long the client waited before giving up.
        duration_ms: u64,
    },

    /// The node executed the call and answered with a failing status.
    ///
    /// Read-only calls (`select`, `desc`) have no receipt, so the node's
    /// answer is carried here instead.
    #[error("Contract call failed with status {status}: {message}")]
    CallFailed {
        /// Hex quantity status, same encoding as a receipt's status.
        status: String,
        /// Hex output returned by the call, possibly empty.
        output: String,
        /// Message reported by the node.
        message: String,
    },

    /// The node rejected the JSON-RPC request itself.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The ledger client is shutting down and accepts no more calls.
    #[error("Ledger client shutting down")]
    Shutdown,
}

impl LedgerError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Creates a new `CallFailed` error.
    #[must_use]
    pub fn call_failed(
        status: impl Into<String>,
        output: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CallFailed { status: status.into(), output: output.into(), message: message.into() }
    }

    /// Returns `true` if the error happened before the node answered.
    ///
    /// Transport failures say nothing about whether the transaction was
    /// applied, which matters to callers deciding what to do next.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. } | Self::Shutdown)
    }
}
