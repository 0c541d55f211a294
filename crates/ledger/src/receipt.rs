//! Transaction receipts as returned by the ledger node.

use serde::{Deserialize, Serialize};

/// Receipt status value the ledger uses for a successfully executed
/// transaction.
pub const STATUS_OK: &str = "0x0";

/// An event log emitted while executing a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Address of the contract that emitted the log.
    pub address: String,
    /// Indexed topics, hex encoded.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Non-indexed payload, hex encoded.
    #[serde(default)]
    pub data: String,
}

/// The ledger's record of a submitted transaction.
///
/// Owned by the ledger client; the CRUD layer only inspects it. Field
/// names follow the node's JSON-RPC encoding.
///
/// # Example
///
/// ```
/// use precompiled_ledger::TransactionReceipt;
///
/// let receipt: TransactionReceipt = serde_json::from_str(
///     r#"{"transactionHash":"0xab","blockNumber":"0x1","status":"0x0","output":"0x"}"#,
/// )
/// .unwrap();
/// assert!(receipt.is_status_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Hash of the transaction this receipt belongs to.
    pub transaction_hash: String,
    /// Block the transaction was included in, as a hex quantity.
    #[serde(default)]
    pub block_number: String,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Target contract address.
    #[serde(default)]
    pub to: String,
    /// Gas consumed, as a hex quantity.
    #[serde(default)]
    pub gas_used: String,
    /// Ledger-level execution status as a hex quantity. `"0x0"` is success.
    pub status: String,
    /// Return data of the call, hex encoded with a `0x` prefix.
    #[serde(default)]
    pub output: String,
    /// Optional human-readable message attached by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Logs emitted during execution.
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Returns `true` if the ledger executed the transaction successfully.
    ///
    /// This says nothing about the precompiled contract's own return code,
    /// which lives in [`output`](Self::output).
    #[must_use]
    pub fn is_status_ok(&self) -> bool {
        parse_status(&self.status) == Some(0)
    }
}

/// Parses a hex quantity status (`"0x16"`) or a plain decimal one (`"22"`).
///
/// Returns `None` when the value is neither.
#[must_use]
pub fn parse_status(status: &str) -> Option<i64> {
    let status = status.trim();
    match status.strip_prefix("0x").or_else(|| status.strip_prefix("0X")) {
        Some("") => None,
        Some(digits) => i64::from_str_radix(digits, 16).ok(),
        None => status.parse().ok(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("0x0"), Some(0));
        assert_eq!(parse_status("0x16"), Some(22));
        assert_eq!(parse_status("0X1a"), Some(26));
        assert_eq!(parse_status("12"), Some(12));
        assert_eq!(parse_status("0x"), None);
        assert_eq!(parse_status("bogus"), None);
    }

    #[test]
    fn test_receipt_json_uses_camel_case() {
        let receipt = TransactionReceipt {
            transaction_hash: "0x01".into(),
            status: STATUS_OK.into(),
            gas_used: "0x5208".into(),
            ..Default::default()
        };

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["transactionHash"], "0x01");
        assert_eq!(json["gasUsed"], "0x5208");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_status_ok_accepts_padded_zero() {
        let receipt = TransactionReceipt { status: "0x000".into(), ..Default::default() };
        assert!(receipt.is_status_ok());

        let receipt = TransactionReceipt { status: "0x16".into(), ..Default::default() };
        assert!(!receipt.is_status_ok());
    }
}
