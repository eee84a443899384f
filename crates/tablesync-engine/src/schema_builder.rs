//! Output schema construction from introspected columns

use tablesync_core::{ColumnMetadata, Field, OutputSchema, AUDIT_COLUMN};
use tablesync_dialect::Dialect;

/// A source column whose name collides with the synthetic audit field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Column {column} collides with the synthetic audit field {}", AUDIT_COLUMN)]
pub struct SchemaConflict {
    /// Source column name as reported by the catalog
    pub column: String,
}

/// Derive the output schema for a column list.
///
/// One field per column, in column order: named with the upper-cased column
/// name, typed through the dialect's type mapping and optional when the
/// column is nullable. The non-optional audit field is appended last.
///
/// A source column that already carries the audit field's name is rejected
/// rather than producing two same-named fields.
pub fn build_schema(
    columns: &[ColumnMetadata],
    dialect: &dyn Dialect,
) -> Result<OutputSchema, SchemaConflict> {
    let mut fields = Vec::with_capacity(columns.len() + 1);

    for column in columns {
        let name = column.name.to_uppercase();
        if name == AUDIT_COLUMN {
            return Err(SchemaConflict {
                column: column.name.clone(),
            });
        }

        let value_type = dialect.map_type(&column.native_type);
        fields.push(Field::new(name, value_type, column.nullable));
    }

    fields.push(Field::audit());

    Ok(OutputSchema::from_fields(fields))
}
