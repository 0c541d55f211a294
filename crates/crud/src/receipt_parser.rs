//! Receipt interpreter.
//!
//! Maps both failure planes of a ledger answer into one [`RetCode`]:
//!
//! 1. A non-zero receipt status is a ledger-level failure. The status is the code; the message is
//!    the revert reason if the output carries one, else the node's message, else the status
//!    table's description. Nothing else is decoded.
//! 2. A zero status with a negative return word is a contract-level failure. The receipt stays
//!    attached.
//! 3. A zero status with an empty output or a non-negative return word is success. The word is
//!    the affected row count.
//!
//! Call-time failures ([`LedgerError`]) go through the same rules via
//! [`parse_call_error`], so callers see one vocabulary wherever the failure
//! happened.

use precompiled_ledger::{
    LedgerError, LedgerStatus, PrecompiledCode, TransactionReceipt,
    abi::{decode_int_word, decode_revert_reason},
    receipt::parse_status,
};

use crate::{
    RetCode, RetStatus,
    error::{CrudError, Result},
};

/// A receipt's verdict before the receipt itself is attached.
enum Verdict {
    Success { affected_rows: Option<u64> },
    Failure { status: RetStatus, code: i64, message: String },
}

/// Interprets a receipt.
///
/// # Errors
///
/// Returns [`CrudError::Decode`] if the status is not a quantity or the
/// output is neither empty nor a valid return word.
pub fn parse_transaction_receipt(table: &str, receipt: TransactionReceipt) -> Result<RetCode> {
    Ok(match classify(table, &receipt)? {
        Verdict::Success { affected_rows } => RetCode::success(receipt, affected_rows),
        Verdict::Failure { status, code, message } => {
            RetCode::rejected(status, code, message, Some(receipt))
        },
    })
}

/// Interprets a receipt, turning a decode failure into an
/// [`RetStatus::Undecodable`] code that still carries the raw receipt.
///
/// Used wherever there is no caller left to hand a [`CrudError`] to.
#[must_use]
pub fn interpret_receipt(table: &str, receipt: TransactionReceipt) -> RetCode {
    match classify(table, &receipt) {
        Ok(Verdict::Success { affected_rows }) => RetCode::success(receipt, affected_rows),
        Ok(Verdict::Failure { status, code, message }) => {
            RetCode::rejected(status, code, message, Some(receipt))
        },
        Err(err) => {
            tracing::warn!(table, error = %err, "Receipt could not be decoded");
            RetCode::rejected(
                RetStatus::Undecodable,
                RetCode::DECODE_FAILED,
                err.to_string(),
                Some(receipt),
            )
        },
    }
}

/// Interprets an error raised by the ledger client instead of a receipt.
#[must_use]
pub fn parse_call_error(err: &LedgerError) -> RetCode {
    let LedgerError::CallFailed { status, output, message } = err else {
        return RetCode::call_failed(RetCode::CALL_FAILED, err.to_string());
    };

    let node_message = Some(message.as_str()).filter(|m| !m.is_empty());
    match parse_status(status) {
        Some(0) => match decode_int_word(output) {
            Ok(code) if code < 0 => RetCode::rejected(
                RetStatus::PrecompiledRejected,
                code,
                precompiled_message(code, node_message),
                None,
            ),
            _ => RetCode::call_failed(RetCode::CALL_FAILED, err.to_string()),
        },
        Some(code) => RetCode::rejected(
            RetStatus::LedgerRejected,
            code,
            ledger_message(code, output, node_message),
            None,
        ),
        None => RetCode::call_failed(RetCode::CALL_FAILED, err.to_string()),
    }
}

fn classify(table: &str, receipt: &TransactionReceipt) -> Result<Verdict> {
    let status = parse_status(&receipt.status).ok_or_else(|| CrudError::Decode {
        table: table.to_owned(),
        message: format!("invalid receipt status {:?}", receipt.status),
        source: None,
    })?;

    let node_message = receipt.message.as_deref().filter(|m| !m.is_empty());
    if status != 0 {
        return Ok(Verdict::Failure {
            status: RetStatus::LedgerRejected,
            code: status,
            message: ledger_message(status, &receipt.output, node_message),
        });
    }

    let output = receipt.output.trim();
    if output.is_empty() || output == "0x" {
        return Ok(Verdict::Success { affected_rows: None });
    }

    let word = decode_int_word(output)
        .map_err(|e| CrudError::decode(table, format!("invalid return word {output}"), e))?;
    if word >= 0 {
        return Ok(Verdict::Success { affected_rows: u64::try_from(word).ok() });
    }

    Ok(Verdict::Failure {
        status: RetStatus::PrecompiledRejected,
        code: word,
        message: precompiled_message(word, node_message),
    })
}

fn ledger_message(status: i64, output: &str, node_message: Option<&str>) -> String {
    decode_revert_reason(output)
        .or_else(|| node_message.map(str::to_owned))
        .unwrap_or_else(|| LedgerStatus(status).to_string())
}

fn precompiled_message(code: i64, node_message: Option<&str>) -> String {
    let code = PrecompiledCode(code);
    code.message()
        .or(node_message)
        .map_or_else(|| code.to_string(), str::to_owned)
}
