//! Oracle dialect using the `user_tab_columns` catalog view
//!
//! The table name is matched as a whole against `user_tab_columns.table_name`
//! after upper-casing, so only tables owned by the connecting user are
//! visible. A schema-qualified name is not split.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let dialect = OracleDialect::new(
//!     OracleConfig::new("localhost", 1521, "system", "welcome123").with_sid("xe"),
//! );
//! let mut conn = dialect.connect()?;
//! let columns = dialect.introspect_columns(conn.as_mut(), "film")?;
//! ```
//!
//! Reference: https://docs.oracle.com/en/database/oracle/oracle-database/19/refrn/USER_TAB_COLUMNS.html

use crate::dialect::{quote_odbc_value, Connection, Dialect, DialectError};
use tablesync_core::{ColumnMetadata, OracleConfig, ValueType, AUDIT_COLUMN};

/// Driver name used when the config does not name one
pub const DEFAULT_DRIVER: &str = "Oracle ODBC Driver";

const CATALOG_QUERY: &str = "SELECT column_name, data_type, nullable \
     FROM user_tab_columns \
     WHERE table_name = ? \
     ORDER BY column_id";

/// Database-side current UTC timestamp
const AUDIT_TIMESTAMP_EXPR: &str = "SYS_EXTRACT_UTC(CURRENT_TIMESTAMP)";

/// Oracle dialect
pub struct OracleDialect {
    config: OracleConfig,
}

impl OracleDialect {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// ODBC connection string with a full connect descriptor
    pub fn connection_string(&self) -> String {
        self.build_connection_string(&quote_odbc_value(&self.config.password))
    }

    /// Connection string safe to log
    pub fn redacted_connection_string(&self) -> String {
        self.build_connection_string("***")
    }

    fn build_connection_string(&self, password: &str) -> String {
        let connect_data = match (&self.config.sid, &self.config.service_name) {
            (Some(sid), _) => format!("(SID={})", sid),
            (None, Some(service)) => format!("(SERVICE_NAME={})", service),
            (None, None) => String::new(),
        };

        format!(
            "DRIVER={{{}}};DBQ=(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA={}));UID={};PWD={};",
            self.config.driver.as_deref().unwrap_or(DEFAULT_DRIVER),
            self.config.host,
            self.config.port,
            connect_data,
            quote_odbc_value(&self.config.user),
            password,
        )
    }

    /// Catalog predicate values for a table name
    pub fn catalog_params(table_name: &str) -> Vec<String> {
        vec![table_name.to_uppercase()]
    }

    /// Convert an Oracle type name to a value type
    ///
    /// - **Numeric**: `NUMBER`, `FLOAT`, `BINARY_FLOAT`, `BINARY_DOUBLE` → `Float64`
    /// - **Temporal**: `DATE`, `TIMESTAMP` and its time-zone variants → `String`
    /// - Everything else → `String`
    pub fn map_oracle_type(native_type: &str) -> ValueType {
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

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "Oracle"
    }

    #[cfg(feature = "odbc")]
    fn connect(&self) -> Result<Box<dyn Connection>, DialectError> {
        tracing::debug!("Connecting to Oracle: {}", self.redacted_connection_string());

        let conn = crate::odbc::OdbcConnection::open(&self.connection_string()).map_err(|e| {
            DialectError::ConnectionError(format!(
                "Oracle at {}:{}: {}",
                self.config.host, self.config.port, e
            ))
        })?;

        tracing::info!("Connected to Oracle at {}:{}", self.config.host, self.config.port);
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
        let params = Self::catalog_params(table_name);
        tracing::debug!("Oracle catalog query {:?}: {}", params, CATALOG_QUERY);

        let mut cursor = conn
            .query(CATALOG_QUERY, &params)
            .map_err(|e| DialectError::CatalogQuery(e.to_string()))?;

        let mut columns = Vec::new();

        while let Some(row) = cursor
            .next_row()
            .map_err(|e| DialectError::CatalogQuery(e.to_string()))?
        {
            let [Some(name), Some(data_type), nullable] = row.as_slice() else {
                return Err(DialectError::CatalogQuery(format!(
                    "Unexpected user_tab_columns row for {}: {:?}",
                    params[0], row
                )));
            };

            columns.push(ColumnMetadata::new(
                name.as_str(),
                data_type.as_str(),
                nullable.as_deref() == Some("Y"),
            ));
        }

        if columns.is_empty() {
            return Err(DialectError::TableNotFound(format!(
                "Table {} not found or has no columns",
                params[0]
            )));
        }

        Ok(columns)
    }

    fn map_type(&self, native_type: &str) -> ValueType {
        Self::map_oracle_type(native_type)
    }

    fn generate_extract_query(&self, columns: &[ColumnMetadata], table_name: &str) -> String {
        let fields: Vec<&str> = columns
            .iter()
            .filter(|c| !c.is_excluded())
            .map(|c| c.name.as_str())
            .collect();

        format!(
            "SELECT {},{} AS {} FROM {}",
            fields.join(","),
            AUDIT_TIMESTAMP_EXPR,
            AUDIT_COLUMN,
            table_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDialect;
    use pretty_assertions::assert_eq;

    fn dialect() -> OracleDialect {
        OracleDialect::new(OracleConfig::new("localhost", 1521, "system", "welcome123").with_sid("xe"))
    }

    #[test]
    fn test_numeric_type_mapping() {
        assert_eq!(OracleDialect::map_oracle_type("NUMBER"), ValueType::Float64);
        assert_eq!(OracleDialect::map_oracle_type("number"), ValueType::Float64);
        assert_eq!(OracleDialect::map_oracle_type("FLOAT"), ValueType::Float64);
        assert_eq!(OracleDialect::map_oracle_type("binary_float"), ValueType::Float64);
        assert_eq!(OracleDialect::map_oracle_type("BINARY_DOUBLE"), ValueType::Float64);
    }

    #[test]
    fn test_temporal_and_unknown_type_mapping() {
        assert_eq!(OracleDialect::map_oracle_type("DATE"), ValueType::String);
        assert_eq!(OracleDialect::map_oracle_type("TIMESTAMP WITH TIME ZONE"), ValueType::String);
        assert_eq!(
            OracleDialect::map_oracle_type("timestamp with local time zone"),
            ValueType::String
        );
        assert_eq!(OracleDialect::map_oracle_type("VARCHAR2"), ValueType::String);
        assert_eq!(OracleDialect::map_oracle_type("SDO_GEOMETRY"), ValueType::String);
        assert_eq!(OracleDialect::map_oracle_type(""), ValueType::String);
    }

    #[test]
    fn test_connection_string_with_sid() {
        assert_eq!(
            dialect().connection_string(),
            "DRIVER={Oracle ODBC Driver};\
             DBQ=(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=localhost)(PORT=1521))(CONNECT_DATA=(SID=xe)));\
             UID=system;PWD=welcome123;"
        );
    }

    #[test]
    fn test_connection_string_with_service_name() {
        let dialect = OracleDialect::new(
            OracleConfig::new("db.example.com", 1522, "app", "p;w")
                .with_service_name("ORCLPDB1")
                .with_driver("Oracle 21 ODBC driver"),
        );

        let conn_str = dialect.connection_string();
        assert!(conn_str.starts_with("DRIVER={Oracle 21 ODBC driver};"));
        assert!(conn_str.contains("(CONNECT_DATA=(SERVICE_NAME=ORCLPDB1))"));
        assert!(conn_str.ends_with("PWD={p;w};"));

        let redacted = dialect.redacted_connection_string();
        assert!(redacted.ends_with("PWD=***;"));
        assert!(!redacted.contains("p;w"));
    }

    #[test]
    fn test_extract_query() {
        let columns = vec![
            ColumnMetadata::new("ID", "NUMBER", false),
            ColumnMetadata::new("NAME", "VARCHAR2", true),
            ColumnMetadata::audit(),
        ];

        assert_eq!(
            dialect().generate_extract_query(&columns, "FILM"),
            "SELECT ID,NAME,SYS_EXTRACT_UTC(CURRENT_TIMESTAMP) AS SYNC_EXTRACT_DATE FROM FILM"
        );
    }

    #[test]
    fn test_extract_query_drops_marked_columns() {
        let columns = vec![
            ColumnMetadata::new("OLD_SYNC_ROW_HASH", "VARCHAR2", true),
            ColumnMetadata::new("ID", "NUMBER", false),
        ];

        assert_eq!(
            dialect().generate_extract_query(&columns, "HR.FILM"),
            "SELECT ID,SYS_EXTRACT_UTC(CURRENT_TIMESTAMP) AS SYNC_EXTRACT_DATE FROM HR.FILM"
        );
    }

    #[test]
    fn test_extract_query_with_no_surviving_columns() {
        let columns = vec![ColumnMetadata::audit()];

        assert_eq!(
            dialect().generate_extract_query(&columns, "T"),
            "SELECT ,SYS_EXTRACT_UTC(CURRENT_TIMESTAMP) AS SYNC_EXTRACT_DATE FROM T"
        );
    }

    #[test]
    fn test_introspection_upper_cases_whole_name() {
        let mock = MockDialect::new(dialect()).with_catalog(&[
            ColumnMetadata::new("FILM_ID", "NUMBER", false),
            ColumnMetadata::new("TITLE", "VARCHAR2", true),
        ]);

        let mut conn = mock.connect().unwrap();
        let columns = dialect().introspect_columns(conn.as_mut(), "hr.film").unwrap();

        assert_eq!(
            columns,
            vec![
                ColumnMetadata::new("FILM_ID", "NUMBER", false),
                ColumnMetadata::new("TITLE", "VARCHAR2", true),
            ]
        );

        let executed = mock.executed_queries();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].sql, CATALOG_QUERY);
        assert_eq!(executed[0].params, vec!["HR.FILM".to_string()]);
    }

    #[test]
    fn test_introspection_empty_catalog() {
        let mock = MockDialect::new(dialect()).with_rows(vec![]);

        let mut conn = mock.connect().unwrap();
        let err = dialect().introspect_columns(conn.as_mut(), "MISSING").unwrap_err();

        assert!(matches!(err, DialectError::TableNotFound(ref msg) if msg.contains("MISSING")));
    }

    #[test]
    fn test_introspection_query_failure() {
        let mock = MockDialect::new(dialect()).with_query_error("ORA-00942: table or view does not exist");

        let mut conn = mock.connect().unwrap();
        let err = dialect().introspect_columns(conn.as_mut(), "FILM").unwrap_err();

        assert!(matches!(err, DialectError::CatalogQuery(_)));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_introspection_logs_catalog_query() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mock = MockDialect::new(dialect()).with_catalog(&[ColumnMetadata::new("FILM_ID", "NUMBER", false)]);
        tracing::subscriber::with_default(subscriber, || {
            let mut conn = mock.connect().unwrap();
            dialect().introspect_columns(conn.as_mut(), "film").unwrap();
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Oracle catalog query"), "{}", output);
        assert!(output.contains("\"FILM\""), "{}", output);
        assert!(output.contains("user_tab_columns"), "{}", output);
    }
}
