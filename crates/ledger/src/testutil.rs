//! Shared test utilities for code built on the ledger client surface.
//!
//! This module provides receipt builders for each interesting shape a node
//! can answer with. It is feature-gated behind `testutil` to prevent
//! leaking into production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! precompiled-ledger = { path = "../ledger", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use precompiled_ledger::testutil::{precompiled_receipt, status_receipt};
//! ```

use crate::{
    LedgerStatus, TransactionReceipt,
    abi::{encode_int_word, encode_revert_reason},
    receipt::STATUS_OK,
};

/// Builds a receipt with the given status and output, and a fixed hash.
#[must_use]
pub fn receipt(status: &str, output: &str) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: format!("0x{:064x}", 0xabcd),
        block_number: "0x1".to_owned(),
        status: status.to_owned(),
        output: output.to_owned(),
        ..Default::default()
    }
}

/// Builds a ledger-success receipt whose return word is `code`.
#[must_use]
pub fn precompiled_receipt(code: i64) -> TransactionReceipt {
    receipt(STATUS_OK, &encode_int_word(code))
}

/// Builds a ledger-success receipt with an empty (`0x`) output.
#[must_use]
pub fn empty_output_receipt() -> TransactionReceipt {
    receipt(STATUS_OK, "0x")
}

/// Builds a receipt that failed at the ledger level with `status`.
#[must_use]
pub fn status_receipt(status: LedgerStatus) -> TransactionReceipt {
    receipt(&format!("{:#x}", status.0), "0x")
}

/// Builds a reverted receipt carrying an `Error(string)` payload.
#[must_use]
pub fn revert_receipt(reason: &str) -> TransactionReceipt {
    receipt(&format!("{:#x}", LedgerStatus::REVERT_INSTRUCTION.0), &encode_revert_reason(reason))
}
