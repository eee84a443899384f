//! DB2 for LUW dialect using the `syscat.columns` catalog view
//!
//! A `SCHEMA.TABLE` name is split and matched against `tabschema` and
//! `tabname` separately. An unqualified name is looked up in the
//! `CURRENT SCHEMA` of the connection. Names are passed through as given,
//! without case normalization.
//!
//! Reference: https://www.ibm.com/docs/en/db2/11.5?topic=views-syscatcolumns

use crate::dialect::{quote_odbc_value, Connection, Dialect, DialectError};
use tablesync_core::{ColumnMetadata, Db2Config, ValueType, AUDIT_COLUMN};

/// Driver name used when the config does not name one
pub const DEFAULT_DRIVER: &str = "IBM DB2 ODBC DRIVER";

const CATALOG_QUERY_QUALIFIED: &str = "SELECT colname AS column_name, typename AS data_type, nulls AS nullable \
     FROM syscat.columns \
     WHERE tabname = ? AND tabschema = ? \
     ORDER BY colno ASC";

const CATALOG_QUERY_CURRENT_SCHEMA: &str = "SELECT colname AS column_name, typename AS data_type, nulls AS nullable \
     FROM syscat.columns \
     WHERE tabname = ? AND tabschema = CURRENT SCHEMA \
     ORDER BY colno ASC";

/// Database-side current UTC timestamp
const AUDIT_TIMESTAMP_EXPR: &str = "CURRENT TIMESTAMP - CURRENT TIMEZONE";

/// DB2 for LUW dialect
pub struct Db2Dialect {
    config: Db2Config,
}

impl Db2Dialect {
    pub fn new(config: Db2Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Db2Config {
        &self.config
    }

    /// ODBC connection string in DB2 CLI keyword syntax
    pub fn connection_string(&self) -> String {
        self.build_connection_string(&quote_odbc_value(&self.config.password))
    }

    /// Connection string safe to log
    pub fn redacted_connection_string(&self) -> String {
        self.build_connection_string("***")
    }

    fn build_connection_string(&self, password: &str) -> String {
        format!(
            "DRIVER={{{}}};HOSTNAME={};DATABASE={};PORT={};PROTOCOL=TCPIP;UID={};PWD={};",
            self.config.driver.as_deref().unwrap_or(DEFAULT_DRIVER),
            self.config.host,
            self.config.database,
            self.config.port,
            quote_odbc_value(&self.config.user),
            password,
        )
    }

    /// Split `SCHEMA.TABLE` into its parts; an unqualified name has no schema
    pub fn split_table_name(table_name: &str) -> (Option<&str>, &str) {
        match table_name.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, table_name),
        }
    }

    /// Catalog query text and predicate values for a table name
    pub fn catalog_query(table_name: &str) -> (&'static str, Vec<String>) {
        match Self::split_table_name(table_name) {
            (Some(schema), table) => (
                CATALOG_QUERY_QUALIFIED,
                vec![table.to_string(), schema.to_string()],
            ),
            (None, table) => (CATALOG_QUERY_CURRENT_SCHEMA, vec![table.to_string()]),
        }
    }

    /// Convert a DB2 type name to a value type
    pub fn map_db2_type(native_type: &str) -> ValueType {
        match native_type.trim().to_uppercase().as_str() {
            "NUMBER" | "FLOAT" | "BINARY_FLOAT" | "BINARY_DOUBLE" => ValueType::Float64,
            "DATE"
            | "TIMESTAMP"
            | "TIMESTAMP WITH TIME ZONE"
            | "TIMESTAMP WITH LOCAL TIME ZONE" => ValueType::String,
            _ => ValueType::String,
        }
    }
}

impl Dialect for Db2Dialect {
    fn name(&self) -> &'static str {
        "DB2"
    }

    #[cfg(feature = "odbc")]
    fn connect(&self) -> Result<Box<dyn Connection>, DialectError> {
        tracing::debug!("Connecting to DB2: {}", self.redacted_connection_string());

        let conn = crate::odbc::OdbcConnection::open(&self.connection_string()).map_err(|e| {
            DialectError::ConnectionError(format!(
                "DB2 at {}:{}/{}: {}",
                self.config.host, self.config.port, self.config.database, e
            ))
        })?;

        tracing::info!(
            "Connected to DB2 at {}:{}/{}",
            self.config.host,
            self.config.port,
            self.config.database
        );
        Ok(Box::new(conn))
    }

    #[cfg(not(feature = "odbc"))]
    fn connect(&self) -> Result<Box<dyn Connection>, DialectError> {
        Err(DialectError::ConfigError(
            "ODBC support not compiled. Rebuild with: cargo build --features odbc".to_string(),
        ))
    }

    fn introspect_columns(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> Result<Vec<ColumnMetadata>, DialectError> {
        let (query, params) = Self::catalog_query(table_name);
        tracing::debug!("DB2 catalog query {:?}: {}", params, query);

        let mut cursor = conn
            .query(query, &params)
            .map_err(|e| DialectError::CatalogQuery(e.to_string()))?;

        let mut columns = Vec::new();

        while let Some(row) = cursor
            .next_row()
            .map_err(|e| DialectError::CatalogQuery(e.to_string()))?
        {
            match row.as_slice() {
                [Some(name), Some(type_name), nulls] => columns.push(ColumnMetadata::new(
                    name.as_str(),
                    type_name.as_str(),
                    nulls.as_deref() == Some("Y"),
                )),
                _ => {
                    return Err(DialectError::CatalogQuery(format!(
                        "Unexpected syscat.columns row for {}: {:?}",
                        table_name, row
                    )))
                }
            }
        }

        if columns.is_empty() {
            return Err(DialectError::TableNotFound(format!(
                "Table {} not found or has no columns",
                table_name
            )));
        }

        Ok(columns)
    }

    fn map_type(&self, native_type: &str) -> ValueType {
        Self::map_db2_type(native_type)
    }

    fn generate_extract_query(&self, columns: &[ColumnMetadata], table_name: &str) -> String {
        let mut sql = String::from("SELECT ");

        let projection: Vec<&str> = columns
            .iter()
            .filter(|c| !c.is_excluded())
            .map(|c| c.name.as_str())
            .collect();
        sql.push_str(&projection.join(","));

        sql.push(',');
        sql.push_str(AUDIT_TIMESTAMP_EXPR);
        sql.push_str(" AS ");
        sql.push_str(AUDIT_COLUMN);

        sql.push_str(" FROM ");
        sql.push_str(table_name);
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDialect;
    use pretty_assertions::assert_eq;

    fn dialect() -> Db2Dialect {
        Db2Dialect::new(Db2Config::new("db2.local", 50000, "SAMPLE", "db2inst1", "secret"))
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(Db2Dialect::map_db2_type("NUMBER"), ValueType::Float64);
        assert_eq!(Db2Dialect::map_db2_type("Float"), ValueType::Float64);
        assert_eq!(Db2Dialect::map_db2_type("TIMESTAMP"), ValueType::String);
        assert_eq!(Db2Dialect::map_db2_type("VARCHAR"), ValueType::String);
        assert_eq!(Db2Dialect::map_db2_type("XML"), ValueType::String);
    }

    #[test]
    fn test_connection_string() {
        assert_eq!(
            dialect().connection_string(),
            "DRIVER={IBM DB2 ODBC DRIVER};HOSTNAME=db2.local;DATABASE=SAMPLE;PORT=50000;\
             PROTOCOL=TCPIP;UID=db2inst1;PWD=secret;"
        );
        assert!(dialect().redacted_connection_string().contains("PWD=***;"));
    }

    #[test]
    fn test_split_table_name() {
        assert_eq!(Db2Dialect::split_table_name("DB2INST1.EMPLOYEE"), (Some("DB2INST1"), "EMPLOYEE"));
        assert_eq!(Db2Dialect::split_table_name("EMPLOYEE"), (None, "EMPLOYEE"));
    }

    #[test]
    fn test_catalog_query_selection() {
        let (query, params) = Db2Dialect::catalog_query("DB2INST1.EMPLOYEE");
        assert_eq!(query, CATALOG_QUERY_QUALIFIED);
        assert_eq!(params, vec!["EMPLOYEE".to_string(), "DB2INST1".to_string()]);

        let (query, params) = Db2Dialect::catalog_query("employee");
        assert_eq!(query, CATALOG_QUERY_CURRENT_SCHEMA);
        assert_eq!(params, vec!["employee".to_string()]);
    }

    #[test]
    fn test_extract_query() {
        let columns = vec![
            ColumnMetadata::new("EMPNO", "CHARACTER", false),
            ColumnMetadata::new("SALARY", "DECIMAL", true),
            ColumnMetadata::audit(),
        ];

        assert_eq!(
            dialect().generate_extract_query(&columns, "DB2INST1.EMPLOYEE"),
            "SELECT EMPNO,SALARY,CURRENT TIMESTAMP - CURRENT TIMEZONE AS SYNC_EXTRACT_DATE \
             FROM DB2INST1.EMPLOYEE"
        );
    }

    #[test]
    fn test_introspection_splits_qualified_name() {
        let mock = MockDialect::new(dialect()).with_catalog(&[
            ColumnMetadata::new("EMPNO", "CHARACTER", false),
            ColumnMetadata::new("BONUS", "DECIMAL", true),
        ]);

        let mut conn = mock.connect().unwrap();
        let columns = dialect()
            .introspect_columns(conn.as_mut(), "DB2INST1.EMPLOYEE")
            .unwrap();

        assert_eq!(columns.len(), 2);
        assert!(!columns[0].nullable);
        assert!(columns[1].nullable);

        let executed = mock.executed_queries();
        assert_eq!(executed[0].params, vec!["EMPLOYEE".to_string(), "DB2INST1".to_string()]);
    }

    #[test]
    fn test_introspection_rejects_malformed_row() {
        let mock = MockDialect::new(dialect())
            .with_rows(vec![vec![Some("EMPNO".to_string()), None, Some("N".to_string())]]);

        let mut conn = mock.connect().unwrap();
        let err = dialect().introspect_columns(conn.as_mut(), "EMPLOYEE").unwrap_err();

        assert!(matches!(err, DialectError::CatalogQuery(_)));
    }
}
