//! Configuration for [`TableCrudService`](crate::TableCrudService).

use serde::{Deserialize, Serialize};

use crate::error::{CrudError, Result};

/// Default maximum key field length, in bytes.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 255;

/// Configuration for [`TableCrudService`](crate::TableCrudService).
///
/// # Example
///
/// ```
/// use precompiled_crud::CrudConfig;
///
/// let config = CrudConfig::builder()
///     .max_key_length(64)
///     .strict_field_names(false)
///     .build()?;
/// assert_eq!(config.max_key_length(), 64);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrudConfig {
    /// Longest key field name accepted by `create_table`.
    #[serde(default = "default_max_key_length")]
    pub(crate) max_key_length: usize,

    /// Reject field names containing the value-field delimiter.
    #[serde(default = "default_strict_field_names")]
    pub(crate) strict_field_names: bool,

    /// Trailing free-form argument passed to every row call.
    #[serde(default)]
    pub(crate) optional: String,
}

fn default_max_key_length() -> usize {
    DEFAULT_MAX_KEY_LENGTH
}

fn default_strict_field_names() -> bool {
    true
}

impl Default for CrudConfig {
    fn default() -> Self {
        Self {
            max_key_length: default_max_key_length(),
            strict_field_names: default_strict_field_names(),
            optional: String::new(),
        }
    }
}

#[bon::bon]
impl CrudConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `max_key_length` - Longest key field name in bytes (default: 255).
    /// * `strict_field_names` - Reject field names containing `,` (default: true).
    /// * `optional` - Extra argument for insert, update, remove and select (default: empty).
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Config`] if `max_key_length` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_KEY_LENGTH)] max_key_length: usize,
        #[builder(default = true)] strict_field_names: bool,
        #[builder(into, default)] optional: String,
    ) -> Result<Self> {
        let config = Self { max_key_length, strict_field_names, optional };
        config.validate()?;
        Ok(config)
    }

    /// Checks a configuration obtained through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Config`] if `max_key_length` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_key_length == 0 {
            return Err(CrudError::Config("max_key_length must be at least 1".into()));
        }
        Ok(())
    }

    /// Returns the maximum key field length.
    #[must_use]
    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Returns whether delimiter-bearing field names are rejected.
    #[must_use]
    pub fn strict_field_names(&self) -> bool {
        self.strict_field_names
    }

    /// Returns the trailing argument passed to row calls.
    #[must_use]
    pub fn optional(&self) -> &str {
        &self.optional
    }
}
