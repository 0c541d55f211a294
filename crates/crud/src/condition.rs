//! Query predicates for update, remove and select.

use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeMap};

/// Field name the wire format reserves for the limit clause.
pub const LIMIT_FIELD: &str = "limit";

/// Comparison operator of a condition clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Result window, value is `"<offset>,<count>"`.
    Limit,
}

impl ConditionOp {
    /// Returns the operator's wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Limit => "limit",
        }
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of predicate clauses keyed by field name and operator.
///
/// Clauses on different fields are combined with AND by the contract.
/// Setting the same operator on the same field again overwrites its value;
/// different operators on one field sit side by side, which is how range
/// predicates are expressed.
///
/// An empty condition matches every row. Passing `None` where an
/// `Option<&Condition>` is expected encodes exactly like an empty one.
///
/// [`LIMIT_FIELD`] is reserved for the result window. A comparison on a
/// column named `limit` cannot be expressed and fails to encode with
/// [`EncodeError::ReservedField`](crate::EncodeError::ReservedField).
///
/// # Example
///
/// ```
/// use precompiled_crud::Condition;
///
/// let mut condition = Condition::new();
/// condition.ge("age", "18").lt("age", "65").limit(10);
///
/// assert_eq!(
///     serde_json::to_string(&condition).unwrap(),
///     r#"{"age":{"ge":"18","lt":"65"},"limit":{"limit":"0,10"}}"#,
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Condition {
    clauses: Vec<(String, Vec<(ConditionOp, String)>)>,
}

impl Condition {
    /// Creates an empty condition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause with an explicit operator.
    pub fn push(
        &mut self,
        field: impl Into<String>,
        op: ConditionOp,
        value: impl Into<String>,
    ) -> &mut Self {
        let field = field.into();
        let value = value.into();
        let ops = match self.clauses.iter_mut().position(|(f, _)| *f == field) {
            Some(index) => &mut self.clauses[index].1,
            None => {
                self.clauses.push((field, Vec::new()));
                let last = self.clauses.len() - 1;
                &mut self.clauses[last].1
            },
        };
        match ops.iter_mut().find(|(o, _)| *o == op) {
            Some((_, existing)) => *existing = value,
            None => ops.push((op, value)),
        }
        self
    }

    /// `field == value`.
    pub fn eq(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Eq, value)
    }

    /// `field != value`.
    pub fn ne(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Ne, value)
    }

    /// `field > value`.
    pub fn gt(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Gt, value)
    }

    /// `field >= value`.
    pub fn ge(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Ge, value)
    }

    /// `field < value`.
    pub fn lt(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Lt, value)
    }

    /// `field <= value`.
    pub fn le(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(field, ConditionOp::Le, value)
    }

    /// Returns at most `count` rows. Replaces any earlier window.
    pub fn limit(&mut self, count: u32) -> &mut Self {
        self.limit_offset(0, count)
    }

    /// Skips `offset` matching rows, then returns at most `count`.
    pub fn limit_offset(&mut self, offset: u32, count: u32) -> &mut Self {
        self.push(LIMIT_FIELD, ConditionOp::Limit, format!("{offset},{count}"))
    }

    /// Returns the number of clauses across all fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.iter().map(|(_, ops)| ops.len()).sum()
    }

    /// Returns `true` if the condition matches every row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterates over `(field, operator, value)` clauses in insertion order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, ConditionOp, &str)> {
        self.clauses.iter().flat_map(|(field, ops)| {
            ops.iter().map(move |(op, value)| (field.as_str(), *op, value.as_str()))
        })
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.clauses.len()))?;
        for (field, ops) in &self.clauses {
            map.serialize_entry(field, &Operators(ops))?;
        }
        map.end()
    }
}

struct Operators<'a>(&'a [(ConditionOp, String)]);

impl Serialize for Operators<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (op, value) in self.0 {
            map.serialize_entry(op.as_str(), value)?;
        }
        map.end()
    }
}
