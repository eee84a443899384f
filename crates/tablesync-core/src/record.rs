//! Schema-driven generic records
//!
//! A [`Record`] is a vector of [`Value`]s indexed by field position in an
//! [`OutputSchema`]. Rows arrive from the source as text cells and are
//! scanned positionally into typed values.

use crate::schema::{OutputSchema, ValueType};
use serde::Serialize;

/// One source row as delivered by a cursor: a text cell per projected column,
/// `None` for SQL NULL
pub type SourceRow = Vec<Option<String>>;

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Float64(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type of a non-null value
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Float64(_) => Some(ValueType::Float64),
            Self::String(_) => Some(ValueType::String),
        }
    }
}

/// Reasons a row cannot be scanned into (or validated against) a schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("Row has {actual} columns, schema expects {expected}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("NULL value in non-optional field {field}")]
    NullInRequiredField { field: String },

    #[error("Field {field}: cannot parse {value:?} as a number")]
    InvalidNumber { field: String, value: String },

    #[error("Field {field}: expected {expected} value")]
    TypeMismatch { field: String, expected: ValueType },
}

/// A record conforming to an [`OutputSchema`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Build a record from values without validation
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Scan a source row positionally into the schema's fields.
    ///
    /// The row must have exactly one cell per field. Cells for `Float64`
    /// fields must parse as numbers; NULL is accepted only in optional fields.
    pub fn scan(schema: &OutputSchema, row: &[Option<String>]) -> Result<Self, ScanError> {
        if row.len() != schema.len() {
            return Err(ScanError::ColumnCount {
                expected: schema.len(),
                actual: row.len(),
            });
        }

        let mut values = Vec::with_capacity(row.len());

        for (field, cell) in schema.fields().iter().zip(row) {
            let value = match cell {
                None if field.optional => Value::Null,
                None => {
                    return Err(ScanError::NullInRequiredField {
                        field: field.name.clone(),
                    })
                }
                Some(text) => match field.value_type {
                    ValueType::Float64 => {
                        let parsed = text.trim().parse::<f64>().map_err(|_| {
                            ScanError::InvalidNumber {
                                field: field.name.clone(),
                                value: text.clone(),
                            }
                        })?;
                        Value::Float64(parsed)
                    }
                    ValueType::String => Value::String(text.clone()),
                },
            };
            values.push(value);
        }

        Ok(Self { values })
    }

    /// Check length, types and nullability against a schema
    pub fn conforms_to(&self, schema: &OutputSchema) -> Result<(), ScanError> {
        if self.values.len() != schema.len() {
            return Err(ScanError::ColumnCount {
                expected: schema.len(),
                actual: self.values.len(),
            });
        }

        for (field, value) in schema.fields().iter().zip(&self.values) {
            match value.value_type() {
                None if !field.optional => {
                    return Err(ScanError::NullInRequiredField {
                        field: field.name.clone(),
                    })
                }
                Some(ty) if ty != field.value_type => {
                    return Err(ScanError::TypeMismatch {
                        field: field.name.clone(),
                        expected: field.value_type,
                    })
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
