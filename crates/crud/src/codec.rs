//! Wire codec for the table precompiled contract.
//!
//! The contract takes every argument as a string:
//!
//! | Argument       | Wire form                                              |
//! |----------------|--------------------------------------------------------|
//! | entry          | JSON object, field order preserved: `{"name":"alice"}` |
//! | condition      | JSON object of operator maps: `{"age":{"gt":"18"}}`    |
//! | value fields   | names joined by `,`: `"age,city"`                      |
//! | select result  | JSON array of row objects                              |
//!
//! Encoding and decoding are pure; nothing here touches the network.

use serde::{Deserialize, Serialize};

use crate::{
    Condition, ConditionOp, Entry,
    condition::LIMIT_FIELD,
    error::{CrudError, EncodeError, Result},
};

/// Delimiter between value field names. Reserved: it must not appear
/// inside a field name.
pub const VALUE_FIELD_DELIMITER: char = ',';

/// Key of the key field name in a `desc` result row.
pub const KEY_FIELD_NAME: &str = "keyField";

/// Key of the joined value field names in a `desc` result row.
pub const VALUE_FIELD_NAME: &str = "valueFields";

/// Encodes a row as a JSON object in field order.
///
/// # Errors
///
/// Returns [`EncodeError::EmptyFieldName`] if any field name is empty.
pub fn encode_entry(entry: &Entry) -> std::result::Result<String, EncodeError> {
    if entry.fields().any(str::is_empty) {
        return Err(EncodeError::EmptyFieldName);
    }
    Ok(serde_json::to_string(entry)?)
}

/// Encodes a condition. An absent condition encodes as `{}`, the same as
/// an empty one.
///
/// # Errors
///
/// Returns [`EncodeError::EmptyFieldName`] if any clause names an empty
/// field.
pub fn encode_condition(condition: Option<&Condition>) -> std::result::Result<String, EncodeError> {
    let empty = Condition::new();
    let condition = condition.unwrap_or(&empty);
    for (field, op, _) in condition.clauses() {
        if field.is_empty() {
            return Err(EncodeError::EmptyFieldName);
        }
        if field == LIMIT_FIELD && op != ConditionOp::Limit {
            return Err(EncodeError::ReservedField(LIMIT_FIELD));
        }
    }
    Ok(serde_json::to_string(condition)?)
}

/// Joins value field names with [`VALUE_FIELD_DELIMITER`].
pub fn join_value_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            joined.push(VALUE_FIELD_DELIMITER);
        }
        joined.push_str(field.as_ref());
    }
    joined
}

/// Fails with [`CrudError::KeyTooLong`] if `key` is longer than `max`
/// bytes.
pub fn check_key_length(key: &str, max: usize) -> Result<()> {
    if key.len() > max {
        return Err(CrudError::KeyTooLong { key: key.to_owned(), length: key.len(), max });
    }
    Ok(())
}

/// Validates schema field names.
///
/// Empty names are always rejected. Names containing the delimiter are
/// rejected only when `strict` is set; otherwise they are joined verbatim.
pub fn check_field_names<'a>(names: impl IntoIterator<Item = &'a str>, strict: bool) -> Result<()> {
    for name in names {
        if name.is_empty() {
            return Err(CrudError::InvalidFieldName {
                name: name.to_owned(),
                reason: "field name must not be empty",
            });
        }
        if strict && name.contains(VALUE_FIELD_DELIMITER) {
            return Err(CrudError::InvalidFieldName {
                name: name.to_owned(),
                reason: "field name contains the value field delimiter ','",
            });
        }
    }
    Ok(())
}

/// Decodes a select result into rows, preserving row and field order.
///
/// # Errors
///
/// Returns [`CrudError::Decode`] naming `table` if the payload is not an
/// array of flat objects.
pub fn parse_select_result(table: &str, raw: &str) -> Result<Vec<Entry>> {
    serde_json::from_str(raw).map_err(|e| CrudError::decode(table, "malformed select result", e))
}

/// Schema of a table as reported by `desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Name of the key field.
    pub key_field: String,
    /// Value field names in declaration order.
    pub value_fields: Vec<String>,
}

impl TableDescriptor {
    /// Builds a descriptor from the contract's `(key, joined values)` pair.
    #[must_use]
    pub fn from_wire(key_field: impl Into<String>, value_fields: &str) -> Self {
        Self {
            key_field: key_field.into(),
            value_fields: value_fields
                .split(VALUE_FIELD_DELIMITER)
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Returns the value fields joined as on the wire.
    #[must_use]
    pub fn joined_value_fields(&self) -> String {
        join_value_fields(&self.value_fields)
    }

    /// Returns the descriptor as a single row keyed by
    /// [`KEY_FIELD_NAME`] and [`VALUE_FIELD_NAME`].
    #[must_use]
    pub fn to_entries(&self) -> Vec<Entry> {
        vec![
            Entry::new()
                .with(KEY_FIELD_NAME, self.key_field.clone())
                .with(VALUE_FIELD_NAME, self.joined_value_fields()),
        ]
    }
}
