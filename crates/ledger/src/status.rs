//! The ledger's two error code spaces.
//!
//! A receipt carries a ledger-level execution status (gas, signature,
//! permission, revert, ...) and, on success, an application-level return
//! word written by the precompiled contract. The two spaces overlap
//! numerically, so they are kept apart here: [`LedgerStatus`] names the
//! first and [`PrecompiledCode`] the second.

use std::fmt;

/// Ledger-level transaction execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerStatus(pub i64);

macro_rules! ledger_statuses {
    ($($(#[$meta:meta])* $name:ident = $code:literal, $message:expr;)*) => {
        impl LedgerStatus {
            $(
                $(#[$meta])*
                pub const $name: Self = Self($code);
            )*

            /// Returns the ledger's description of this status, or `None`
            /// for a status this client does not know.
            #[must_use]
            pub fn message(self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some($message),)*
                    _ => None,
                }
            }
        }
    };
}

ledger_statuses! {
    /// Executed successfully.
    SUCCESS = 0, "Success";
    /// Unknown failure.
    UNKNOWN = 1, "Unknown";
    /// Malformed RLP encoding.
    BAD_RLP = 2, "Bad RLP";
    /// Malformed transaction.
    INVALID_FORMAT = 3, "Invalid format";
    /// Not enough gas for the intrinsic cost.
    OUT_OF_GAS_INTRINSIC = 4, "Out-of-gas during intrinsic gas calculation";
    /// Signature verification failed.
    INVALID_SIGNATURE = 5, "Invalid signature";
    /// Invalid nonce.
    INVALID_NONCE = 6, "Invalid nonce";
    /// Sender balance too low.
    NOT_ENOUGH_CASH = 7, "Not enough cash";
    /// Out of gas before execution started.
    OUT_OF_GAS_BASE = 8, "Out-of-gas during VM execution";
    /// Block gas limit reached.
    BLOCK_GAS_LIMIT_REACHED = 9, "Block gas limit reached";
    /// Invalid VM instruction.
    BAD_INSTRUCTION = 10, "Bad instruction";
    /// Invalid jump destination.
    BAD_JUMP_DESTINATION = 11, "Bad jump destination";
    /// Ran out of gas during execution.
    OUT_OF_GAS = 12, "Out-of-gas during EVM execution";
    /// VM stack overflow.
    OUT_OF_STACK = 13, "Out of stack";
    /// VM stack underflow.
    STACK_UNDERFLOW = 14, "Stack underflow";
    /// Nonce already used.
    NONCE_CHECK_FAIL = 15, "Nonce check fail";
    /// Block limit check failed.
    BLOCK_LIMIT_CHECK_FAIL = 16, "Block limit check fail";
    /// Filter check failed.
    FILTER_CHECK_FAIL = 17, "Filter check fail";
    /// Sender may not deploy contracts.
    NO_DEPLOY_PERMISSION = 18, "No deploy permission";
    /// Sender may not call this contract.
    NO_CALL_PERMISSION = 19, "No call permission";
    /// Sender may not send transactions.
    NO_TX_PERMISSION = 20, "No tx permission";
    /// A precompiled contract failed.
    PRECOMPILED_ERROR = 21, "Precompiled error";
    /// Execution reverted.
    REVERT_INSTRUCTION = 22, "Transaction reverted";
    /// Zero signature format is invalid.
    INVALID_ZERO_SIGNATURE_FORMAT = 23, "Invalid zero signature format";
    /// Target address is already in use.
    ADDRESS_ALREADY_USED = 24, "Address already used";
    /// Permission denied.
    PERMISSION_DENIED = 25, "Permission denied";
    /// Call target does not exist.
    CALL_ADDRESS_ERROR = 26, "Call address error";
    /// Gas overflow.
    GAS_OVERFLOW = 27, "Gas overflow";
    /// The transaction pool is full.
    TX_POOL_IS_FULL = 28, "Transaction pool is full";
    /// The node refused the transaction.
    TRANSACTION_REFUSED = 29, "Transaction refused";
    /// The target contract is frozen.
    CONTRACT_FROZEN = 30, "The contract has been frozen";
    /// The sender account is frozen.
    ACCOUNT_FROZEN = 31, "The account has been frozen";
    /// The transaction is already in the pool.
    ALREADY_KNOWN = 10000, "Transaction already in the txPool";
    /// The transaction is already on chain.
    ALREADY_IN_CHAIN = 10001, "Transaction already in the chain";
    /// Wrong chain id.
    INVALID_CHAIN_ID = 10002, "Invalid chain id";
    /// Wrong group id.
    INVALID_GROUP_ID = 10003, "Invalid group id";
    /// Request sent to a node outside the group.
    REQUEST_NOT_BELONG_TO_THE_GROUP = 10004, "The request doesn't belong to the group";
    /// Malformed transaction.
    MALFORMED_TX = 10005, "Malformed transaction";
    /// The group exceeded its memory limit.
    OVER_GROUP_MEMORY_LIMIT = 10006, "Exceeded the group transaction pool capacity limit";
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "Unknown transaction status: {:#x}", self.0),
        }
    }
}

/// Application-level return code written by a precompiled contract.
///
/// Non-negative words are success (the number of affected rows for
/// insert/update/remove). Negative words are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrecompiledCode(pub i64);

macro_rules! precompiled_codes {
    ($($(#[$meta:meta])* $name:ident = $code:literal, $message:expr;)*) => {
        impl PrecompiledCode {
            $(
                $(#[$meta])*
                pub const $name: Self = Self($code);
            )*

            /// Returns the catalog message for a known failure code.
            #[must_use]
            pub fn message(self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some($message),)*
                    _ => None,
                }
            }
        }
    };
}

precompiled_codes! {
    /// Success.
    SUCCESS = 0, "Success";
    /// The sender lacks table permission.
    NO_AUTHORIZED = -50000, "Permission denied";
    /// `createTable` on an existing table.
    TABLE_NAME_ALREADY_EXIST = -50001, "The table already exists";
    /// Table name too long.
    TABLE_NAME_LENGTH_OVERFLOW = -50002, "The length of the table name exceeds the maximum limit";
    /// A field name is too long.
    TABLE_FIELD_LENGTH_OVERFLOW =
        -50003, "The length of the table field name exceeds the maximum limit";
    /// The field names together are too long.
    TABLE_FIELD_TOTAL_LENGTH_OVERFLOW =
        -50004, "The length of all the fields name exceeds the maximum limit";
    /// The key is too long.
    TABLE_KEY_VALUE_LENGTH_OVERFLOW = -50005, "The length of the table key exceeds the maximum limit";
    /// A field value is too long.
    TABLE_FIELD_VALUE_LENGTH_OVERFLOW =
        -50006, "The length of the field value exceeds the maximum limit";
    /// The same field name appears twice.
    TABLE_DUPLICATE_FIELD = -50007, "The table contains duplicated field";
    /// A field name is not part of the table schema.
    TABLE_INVALID_FIELD = -50008, "Invalid table field";
    /// The entry argument could not be parsed.
    PARSE_ENTRY_ERROR = -51500, "Parse the entry for the CRUD precompiled contract failed";
    /// The condition argument could not be parsed.
    PARSE_CONDITION_ERROR = -51501, "Parse the condition for the CRUD precompiled contract failed";
    /// The table does not exist.
    TABLE_NOT_EXIST = -51502, "The table does not exist";
    /// The called function does not exist on the CRUD contract.
    CONDITION_OPERATION_UNDEFINED = -51503, "Undefined function of the CRUD precompiled contract";
}

impl PrecompiledCode {
    /// Returns `true` for non-negative return words.
    #[must_use]
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for PrecompiledCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{message}"),
            None if self.is_success() => write!(f, "Success"),
            None => write!(f, "Unknown precompiled error code: {}", self.0),
        }
    }
}
