//! Async callback adapter.
//!
//! Bridges a caller's completion handler to the ledger client's
//! [`TransactionCallback`] so the handler runs exactly once with a complete
//! [`RetCode`], whatever the client does with the callback:
//!
//! | Client behavior                 | Handler receives                          |
//! |---------------------------------|-------------------------------------------|
//! | invokes callback with a receipt | interpreted receipt                       |
//! | invokes callback with an error  | [`parse_call_error`] of the error         |
//! | drops callback after accepting  | [`crate::RetStatus::CallFailed`], dropped |
//! | rejects the submission          | nothing; the caller gets `Err`            |
//!
//! The handler slot lives behind a mutex shared by the adapter and the
//! callback. The handler is always taken out under the lock and invoked
//! after releasing it, so a handler that re-enters the service cannot
//! deadlock.

use std::{
    future::Future,
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use parking_lot::Mutex;
use precompiled_ledger::{LedgerResult, TransactionCallback, TransactionReceipt};
use tokio::sync::oneshot;

use crate::{
    RetCode,
    error::{CrudError, Result},
    receipt_parser::{interpret_receipt, parse_call_error},
};

/// Completion handler for the `async_*` operations.
pub type RetCodeHandler = Box<dyn FnOnce(RetCode) + Send + 'static>;

enum Slot {
    /// Submission in progress, callback alive.
    Submitting(RetCodeHandler),
    /// Submission accepted, waiting for the callback.
    Armed(RetCodeHandler),
    /// Callback dropped before the submission call returned.
    Orphaned(RetCodeHandler),
    Done,
}

impl Slot {
    fn take(&mut self) -> Option<RetCodeHandler> {
        match mem::replace(self, Self::Done) {
            Self::Submitting(handler) | Self::Armed(handler) | Self::Orphaned(handler) => {
                Some(handler)
            },
            Self::Done => None,
        }
    }
}

fn dropped_ret_code() -> RetCode {
    RetCode::call_failed(
        RetCode::CALLBACK_DROPPED,
        "Ledger client dropped the transaction callback without a response",
    )
}

/// One async submission's view of the handler.
pub(crate) struct CallbackAdapter {
    table: String,
    slot: Arc<Mutex<Slot>>,
}

impl CallbackAdapter {
    pub(crate) fn new(table: &str, handler: RetCodeHandler) -> Self {
        Self { table: table.to_owned(), slot: Arc::new(Mutex::new(Slot::Submitting(handler))) }
    }

    /// Returns the callback to hand to the ledger client.
    pub(crate) fn transaction_callback(&self) -> TransactionCallback {
        let guard = CallbackGuard { table: self.table.clone(), slot: Arc::clone(&self.slot) };
        Box::new(move |result| guard.complete(result))
    }

    /// Settles the adapter once the submission call has returned.
    ///
    /// On `Err` the handler is discarded uninvoked and the failure is
    /// returned to the caller instead.
    pub(crate) fn submitted(self, result: LedgerResult<()>) -> Result<()> {
        match result {
            Ok(()) => {
                let orphaned = {
                    let mut slot = self.slot.lock();
                    match mem::replace(&mut *slot, Slot::Done) {
                        Slot::Submitting(handler) | Slot::Armed(handler) => {
                            *slot = Slot::Armed(handler);
                            None
                        },
                        Slot::Orphaned(handler) => Some(handler),
                        Slot::Done => None,
                    }
                };
                if let Some(handler) = orphaned {
                    tracing::error!(
                        table = %self.table,
                        "Ledger client dropped the transaction callback during submission"
                    );
                    handler(dropped_ret_code());
                }
                Ok(())
            },
            Err(err) => {
                let handler = self.slot.lock().take();
                if handler.is_none() {
                    tracing::warn!(
                        table = %self.table,
                        error = %err,
                        "Submission failed after the callback already completed"
                    );
                }
                drop(handler);
                Err(CrudError::Rejected(parse_call_error(&err)))
            },
        }
    }
}

/// The ledger client's end of the slot. Completing or dropping it settles
/// the handler.
struct CallbackGuard {
    table: String,
    slot: Arc<Mutex<Slot>>,
}

impl CallbackGuard {
    fn complete(self, result: LedgerResult<TransactionReceipt>) {
        let Some(handler) = self.slot.lock().take() else {
            return;
        };

        let ret = match result {
            Ok(receipt) => interpret_receipt(&self.table, receipt),
            Err(err) => parse_call_error(&err),
        };
        if ret.is_success() {
            tracing::debug!(table = %self.table, code = ret.code(), "Async operation succeeded");
        } else {
            tracing::warn!(
                table = %self.table,
                status = %ret.status(),
                code = ret.code(),
                message = ret.message(),
                "Async operation failed"
            );
        }
        handler(ret);
    }
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        let handler = {
            let mut slot = self.slot.lock();
            match mem::replace(&mut *slot, Slot::Done) {
                Slot::Armed(handler) => Some(handler),
                Slot::Submitting(handler) => {
                    *slot = Slot::Orphaned(handler);
                    None
                },
                other => {
                    *slot = other;
                    None
                },
            }
        };
        if let Some(handler) = handler {
            tracing::error!(
                table = %self.table,
                "Ledger client dropped the transaction callback without a response"
            );
            handler(dropped_ret_code());
        }
    }
}

/// Future resolving to the [`RetCode`] of a submitted operation.
///
/// Returned by the `submit_*` operations. It resolves exactly once; if the
/// service side disappears without an answer it resolves to a
/// [`crate::RetStatus::CallFailed`] code rather than hanging.
#[derive(Debug)]
#[must_use = "the outcome is only observable by awaiting the PendingRetCode"]
pub struct PendingRetCode {
    rx: oneshot::Receiver<RetCode>,
}

impl PendingRetCode {
    /// Creates the future together with the handler that resolves it.
    pub(crate) fn channel() -> (RetCodeHandler, Self) {
        let (tx, rx) = oneshot::channel();
        let handler: RetCodeHandler = Box::new(move |ret| {
            // receiver gone means nobody is waiting
            let _ = tx.send(ret);
        });
        (handler, Self { rx })
    }
}

impl Future for PendingRetCode {
    type Output = RetCode;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<RetCode> {
        Pin::new(&mut self.rx).poll(cx).map(|result| result.unwrap_or_else(|_| dropped_ret_code()))
    }
}
