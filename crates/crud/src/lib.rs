//! Relational-table CRUD over a ledger's precompiled table contract.
//!
//! This crate lets an application treat records stored by the ledger's
//! table precompiled contract as a simple relational table. It owns the
//! protocol layer only: encoding rows and conditions into the contract's
//! string arguments, calling the proxies from [`precompiled_ledger`], and
//! decoding receipts into a unified [`RetCode`]. Signing, transport and
//! node-side execution belong to the ledger client behind those proxies.
//!
//! # Features
//!
//! - **Row and condition model**: ordered [`Entry`] rows and a [`Condition`] builder
//! - **Dual-plane results**: [`RetStatus`] tells ledger failures from contract failures
//! - **Blocking and callback submission**: `insert` or `async_insert` / `submit_insert`
//! - **Exactly-once callbacks**: handlers run once even if the client drops the callback
//!
//! # Quick Start
//!
//! ```
//! use precompiled_crud::{CrudConfig, Entry, RetStatus, TableCrudService};
//! use precompiled_ledger::MemoryLedger;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TableCrudService::from_ledger(MemoryLedger::new(), CrudConfig::default())?;
//!
//! let ret = service.create_table("people", "name", &["age", "city"]).await?;
//! assert!(ret.is_success());
//!
//! // a second create is decided by the contract, not the ledger
//! let ret = service.create_table("people", "name", &["age", "city"]).await?;
//! assert_eq!(ret.status(), RetStatus::PrecompiledRejected);
//! assert!(ret.receipt().is_some());
//!
//! let pending = service.submit_insert("people", &Entry::new().with("name", "bob"))?;
//! assert_eq!(pending.await.affected_rows(), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! # Error Surface
//!
//! | Failure                                  | Surfaced as                          |
//! | ---------------------------------------- | ------------------------------------ |
//! | key field too long, bad field name       | `Err`, before any call               |
//! | row or condition cannot be encoded       | `Err`, before any call               |
//! | ledger or contract rejects a mutation    | `Ok(RetCode)` with failure status    |
//! | receipt cannot be decoded (mutation)     | `Ok(RetCode)`, `Undecodable`         |
//! | `select` / `desc` call fails             | `Err(CrudError::Rejected(RetCode))`  |
//! | `select` payload cannot be decoded       | `Err(CrudError::Decode)`             |
//! | async submission refused                 | `Err`, handler never invoked         |
//!
//! # Feature Flags
//!
//! - **`failpoints`**: Activates the `fail` crate's fail points in the submission path.
//! - **`testutil`**: Enables the `testutil` module with service factories over `MemoryLedger`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
/// Wire codec for rows, conditions and schema.
pub mod codec;
mod condition;
mod config;
mod entry;
pub mod error;
/// Receipt interpreter.
pub mod receipt_parser;
mod retcode;
mod service;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use callback::{PendingRetCode, RetCodeHandler};
pub use codec::TableDescriptor;
pub use condition::{Condition, ConditionOp, LIMIT_FIELD};
pub use config::{CrudConfig, DEFAULT_MAX_KEY_LENGTH};
pub use entry::Entry;
pub use error::{CrudError, EncodeError, Result};
pub use retcode::{RetCode, RetStatus};
pub use service::TableCrudService;
