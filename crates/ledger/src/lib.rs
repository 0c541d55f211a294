//! Ledger client surface for the table precompiled contracts.
//!
//! This crate holds everything the CRUD layer consumes from a ledger client
//! without caring how that client talks to a node: the
//! [`TransactionReceipt`] model, the [`CrudPrecompiled`] and
//! [`TableFactory`] proxy traits, the [`LedgerError`] raised by calls, and
//! the two code spaces a receipt can fail in ([`LedgerStatus`] and
//! [`PrecompiledCode`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 precompiled-crud                            │
//! │   TableCrudService │ Entry/Condition codec │ ReceiptParser  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 precompiled-ledger                          │
//! │   CrudPrecompiled │ TableFactory │ TransactionReceipt       │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryLedger │      node-backed client (signing, RPC)       │
//! │   (testing)  │               (external)                     │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with receipt builders.
//! - **`failpoints`**: Activates the `fail` crate's fail points inside [`MemoryLedger`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// ABI helpers for return words and revert payloads.
pub mod abi;
mod error;
/// In-memory ledger for tests and development.
pub mod memory;
mod proxy;
/// Transaction receipt model.
pub mod receipt;
mod status;
/// Shared test utilities for ledger-backed code.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use error::{LedgerError, LedgerResult};
pub use memory::{MemoryLedger, RecordedCall};
pub use proxy::{CrudPrecompiled, TableFactory, TransactionCallback};
pub use receipt::{Log, STATUS_OK, TransactionReceipt};
pub use status::{LedgerStatus, PrecompiledCode};
