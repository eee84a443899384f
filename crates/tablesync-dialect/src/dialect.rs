//! Dialect trait and the connection/cursor contract it works through

use tablesync_core::{ColumnMetadata, SourceRow, ValueType};

/// Errors raised by dialects and their connections
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Catalog query failed: {0}")]
    CatalogQuery(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Forward-only cursor over a query's result rows
pub trait RowCursor {
    /// Fetch the next row, or `None` once the result set is exhausted.
    ///
    /// Cells follow the query's projection order.
    fn next_row(&mut self) -> Result<Option<SourceRow>, DialectError>;
}

/// An open connection to a source database
pub trait Connection {
    /// Execute a query with positional string parameters and return a cursor
    /// over its rows
    fn query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Box<dyn RowCursor + '_>, DialectError>;

    /// Release the connection
    fn close(self: Box<Self>) -> Result<(), DialectError>;
}

/// Capability set implemented once per source database engine
pub trait Dialect: Send + Sync {
    /// Dialect name (e.g., "Oracle", "DB2")
    fn name(&self) -> &'static str;

    /// Open a connection using the dialect's connection-string syntax
    fn connect(&self) -> Result<Box<dyn Connection>, DialectError>;

    /// Read the table's columns from the catalog, in ordinal order.
    ///
    /// Fails with [`DialectError::TableNotFound`] when the catalog reports no
    /// columns.
    fn introspect_columns(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> Result<Vec<ColumnMetadata>, DialectError>;

    /// Map a native column type to an output value type (case-insensitive,
    /// never fails)
    fn map_type(&self, native_type: &str) -> ValueType;

    /// Build the extraction query for the given columns.
    ///
    /// Pure and deterministic: identical inputs give byte-identical SQL.
    fn generate_extract_query(&self, columns: &[ColumnMetadata], table_name: &str) -> String;
}

/// Quote an ODBC connection-string attribute value when it contains
/// characters that would end the attribute
pub fn quote_odbc_value(value: &str) -> String {
    if value.contains(&[';', '{', '}'][..]) || value.starts_with(' ') || value.ends_with(' ') {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}
