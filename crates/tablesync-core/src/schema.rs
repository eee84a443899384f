//! Column metadata and the output record schema

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic extraction-timestamp field appended to every schema
pub const AUDIT_COLUMN: &str = "SYNC_EXTRACT_DATE";

/// Reserved name for a row hash column
pub const ROW_HASH_COLUMN: &str = "SYNC_ROW_HASH";

/// Substrings marking reserved audit columns.
///
/// A column whose name contains any of these is left out of the extraction
/// projection.
pub const EXCLUDED_MARKERS: [&str; 2] = [AUDIT_COLUMN, ROW_HASH_COLUMN];

/// Check whether a column name carries a reserved audit marker
pub fn is_excluded(column_name: &str) -> bool {
    EXCLUDED_MARKERS
        .iter()
        .any(|marker| column_name.contains(marker))
}

/// Value type of an output field
///
/// Temporal source types are carried as text, so two kinds cover every
/// native type the dialects know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 64-bit floating point
    Float64,

    /// UTF-8 text
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float64 => write!(f, "FLOAT64"),
            Self::String => write!(f, "STRING"),
        }
    }
}

/// Descriptor of one source table column, as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name as stored in the catalog
    pub name: String,

    /// Native type name (e.g. `NUMBER`, `VARCHAR2`, `TIMESTAMP`)
    pub native_type: String,

    /// Whether the column accepts NULL
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create a new column descriptor
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            nullable,
        }
    }

    /// The synthetic audit column appended to every introspected column list
    pub fn audit() -> Self {
        Self::new(AUDIT_COLUMN, "TIMESTAMP", false)
    }

    /// Whether this column is left out of the extraction projection
    pub fn is_excluded(&self) -> bool {
        is_excluded(&self.name)
    }
}

/// One field of the output schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name (upper-cased column name)
    pub name: String,

    /// Value type
    pub value_type: ValueType,

    /// Whether the field may hold a null
    pub optional: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType, optional: bool) -> Self {
        Self {
            name: name.into(),
            value_type,
            optional,
        }
    }

    /// Create a non-optional field
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, false)
    }

    /// Create an optional field
    pub fn optional(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, true)
    }

    /// The non-optional audit field that closes every schema
    pub fn audit() -> Self {
        Self::required(AUDIT_COLUMN, ValueType::String)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}: OPTIONAL {}", self.name, self.value_type)
        } else {
            write!(f, "{}: {}", self.name, self.value_type)
        }
    }
}

/// Ordered field list every output record conforms to
///
/// Field order is the source column order, with the audit field last.
/// The schema is read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    fields: Vec<Field>,
}

impl OutputSchema {
    /// Create a schema from an ordered field list
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Fields in record order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get field names in order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Find the first field with the given name
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The trailing audit field, if the schema ends with one
    pub fn audit_field(&self) -> Option<&Field> {
        self.fields.last().filter(|f| f.name == AUDIT_COLUMN)
    }
}
