//! Error types for the CRUD layer.
//!
//! [`CrudError`] covers everything that stops an operation from producing a
//! [`RetCode`]: local validation failures caught before any network call,
//! encoding and decoding failures, and call-time rejections of read-only
//! queries. Failures the ledger reports for a mutating call are not errors
//! at this level; they come back as a failure [`RetCode`].

use std::sync::Arc;

use precompiled_ledger::PrecompiledCode;
use thiserror::Error;

use crate::RetCode;

/// Result type alias for CRUD operations.
pub type Result<T> = std::result::Result<T, CrudError>;

/// Type alias for boxed errors that can be sent across threads.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Failure serializing a row or condition to its wire form.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// A field with an empty name cannot be addressed by the contract.
    #[error("field name must not be empty")]
    EmptyFieldName,

    /// A comparison names a field the wire format reserves.
    #[error("field name {0:?} is reserved")]
    ReservedField(&'static str),

    /// The JSON serializer rejected the value.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors returned by [`TableCrudService`](crate::TableCrudService)
/// operations.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions
/// must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CrudError {
    /// The key field name is longer than the ledger accepts.
    ///
    /// Raised before any network call.
    #[error("The length of the table key exceeds the maximum limit: {length} > {max} ({key})")]
    KeyTooLong {
        /// The offending key field name.
        key: String,
        /// Its length in bytes.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A field name cannot be used on the wire.
    #[error("Invalid field name {name:?}: {reason}")]
    InvalidFieldName {
        /// The offending field name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A row or condition could not be serialized.
    #[error("{message}, error info: {source}")]
    Encoding {
        /// What was being encoded, including the table name.
        message: String,
        /// Underlying serialization failure.
        #[source]
        source: EncodeError,
    },

    /// A receipt or select payload could not be interpreted.
    #[error("Failed to decode result for table {table}: {message}")]
    Decode {
        /// Table the operation targeted.
        table: String,
        /// Description of the failure.
        message: String,
        /// Underlying parse failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The ledger rejected a read-only call.
    ///
    /// Carries the same [`RetCode`] a mutating call would have produced
    /// for the same failure.
    #[error("{0}")]
    Rejected(RetCode),

    /// Invalid service configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrudError {
    /// Creates a new `Decode` error from a parse failure.
    pub fn decode(
        table: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decode { table: table.into(), message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns the numeric code this error is reported with.
    ///
    /// Locally detected key overflows share the ledger's own code so both
    /// sides of the wire agree; rejections carry the ledger's code.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::KeyTooLong { .. } => PrecompiledCode::TABLE_KEY_VALUE_LENGTH_OVERFLOW.0,
            Self::Rejected(ret) => ret.code(),
            Self::Decode { .. } => RetCode::DECODE_FAILED,
            _ => RetCode::CALL_FAILED,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_encoding_error_chains_source() {
        let err = CrudError::Encoding {
            message: "insert Entry{} to t failed".into(),
            source: EncodeError::EmptyFieldName,
        };

        assert_eq!(
            err.to_string(),
            "insert Entry{} to t failed, error info: field name must not be empty"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_decode_error_keeps_table_and_source() {
        let parse_err = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let err = CrudError::decode("people", "malformed select result", parse_err);

        assert!(err.to_string().contains("people"));
        assert!(err.source().is_some());
        assert_eq!(err.code(), RetCode::DECODE_FAILED);
    }

    #[test]
    fn test_key_too_long_code() {
        let err = CrudError::KeyTooLong { key: "k".repeat(4), length: 4, max: 3 };
        assert_eq!(err.code(), -50005);
    }
}
