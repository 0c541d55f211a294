//! Service factories over [`MemoryLedger`].
//!
//! Feature-gated behind `testutil`, which also turns on the ledger
//! crate's receipt builders.
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use precompiled_crud::testutil::memory_service;
//! ```

use precompiled_ledger::MemoryLedger;

use crate::{CrudConfig, Result, TableCrudService};

/// Builds a service over a fresh [`MemoryLedger`] with the default config.
///
/// The returned ledger shares state with the one inside the service, so
/// tests can inspect recorded calls and inject faults through it.
#[must_use]
pub fn memory_service() -> (TableCrudService, MemoryLedger) {
    let ledger = MemoryLedger::new();
    let service = TableCrudService::from_ledger_unchecked(ledger.clone(), CrudConfig::default());
    (service, ledger)
}

/// Builds a service over a fresh [`MemoryLedger`] with `config`.
///
/// # Errors
///
/// Returns [`CrudError::Config`](crate::CrudError::Config) if `config`
/// fails validation.
pub fn memory_service_with(config: CrudConfig) -> Result<(TableCrudService, MemoryLedger)> {
    let ledger = MemoryLedger::new();
    let service = TableCrudService::from_ledger(ledger.clone(), config)?;
    Ok((service, ledger))
}
