//! Integration tests for source dialects
//!
//! Tests requiring a live database are marked with `#[ignore]` and need the
//! `odbc` feature plus the vendor ODBC driver.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all non-ignored tests (no database required)
//! cargo test -p tablesync-dialect --test integration_tests
//!
//! # Run Oracle integration tests
//! TABLESYNC_ORACLE_HOST=localhost \
//! TABLESYNC_ORACLE_USER=system \
//! TABLESYNC_ORACLE_PASSWORD=welcome123 \
//! TABLESYNC_ORACLE_SID=xe \
//! TABLESYNC_ORACLE_TABLE=FILM \
//! cargo test -p tablesync-dialect --features odbc --test integration_tests -- --ignored
//!
//! # Run DB2 integration tests
//! TABLESYNC_DB2_HOST=localhost \
//! TABLESYNC_DB2_DATABASE=SAMPLE \
//! TABLESYNC_DB2_USER=db2inst1 \
//! TABLESYNC_DB2_PASSWORD=secret \
//! TABLESYNC_DB2_TABLE=DB2INST1.EMPLOYEE \
//! cargo test -p tablesync-dialect --features odbc --test integration_tests -- --ignored
//! ```

use tablesync_core::{
    ColumnMetadata, Db2Config, OracleConfig, SourceConfig, ValueType, AUDIT_COLUMN,
};
use tablesync_dialect::{from_source_config, Db2Dialect, Dialect, DialectError, MockDialect, OracleDialect};

// =============================================================================
// Helper Functions
// =============================================================================

fn oracle_config() -> OracleConfig {
    OracleConfig::new("localhost", 1521, "system", "welcome123").with_sid("xe")
}

fn db2_config() -> Db2Config {
    Db2Config::new("localhost", 50000, "SAMPLE", "db2inst1", "secret")
}

fn film_columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("FILM_ID", "NUMBER", false),
        ColumnMetadata::new("TITLE", "VARCHAR2", false),
        ColumnMetadata::new("DESCRIPTION", "CLOB", true),
        ColumnMetadata::new("RENTAL_RATE", "NUMBER", true),
        ColumnMetadata::new("LAST_UPDATE", "DATE", false),
    ]
}

fn both_dialects() -> Vec<Box<dyn Dialect>> {
    vec![
        from_source_config(&SourceConfig::Oracle(oracle_config())),
        from_source_config(&SourceConfig::Db2(db2_config())),
    ]
}

/// Number of items in the SELECT list (commas outside parentheses + 1)
fn projection_len(sql: &str) -> usize {
    let list = sql
        .strip_prefix("SELECT ")
        .and_then(|rest| rest.split(" FROM ").next())
        .unwrap();

    let mut depth = 0;
    let mut items = 1;
    for ch in list.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => items += 1,
            _ => {}
        }
    }
    items
}

// =============================================================================
// Cross-dialect properties (no database required)
// =============================================================================

#[test]
fn test_dialect_selection_from_config() {
    let names: Vec<&str> = both_dialects().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Oracle", "DB2"]);
}

#[test]
fn test_type_mapping_is_total_and_case_insensitive() {
    for dialect in both_dialects() {
        assert_eq!(dialect.map_type("NUMBER"), ValueType::Float64);
        assert_eq!(dialect.map_type("number"), dialect.map_type("NUMBER"));
        assert_eq!(dialect.map_type("TIMESTAMP WITH TIME ZONE"), ValueType::String);
        assert_eq!(dialect.map_type("definitely not a type"), ValueType::String);
    }
}

#[test]
fn test_projection_follows_column_order() {
    for dialect in both_dialects() {
        let columns = film_columns();
        let sql = dialect.generate_extract_query(&columns, "FILM");

        assert_eq!(projection_len(&sql), columns.len() + 1, "{}", sql);

        let expected_prefix = format!(
            "SELECT {},",
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",")
        );
        assert!(sql.starts_with(&expected_prefix), "{}", sql);
        assert!(sql.ends_with(&format!(" AS {} FROM FILM", AUDIT_COLUMN)), "{}", sql);
    }
}

#[test]
fn test_marked_columns_dropped_at_any_position() {
    for dialect in both_dialects() {
        for position in 0..=film_columns().len() {
            let mut columns = film_columns();
            columns.insert(position, ColumnMetadata::new("X_SYNC_ROW_HASH", "VARCHAR2", true));
            columns.insert(position, ColumnMetadata::new(AUDIT_COLUMN, "TIMESTAMP", false));

            let sql = dialect.generate_extract_query(&columns, "FILM");
            assert!(!sql.contains("SYNC_ROW_HASH"), "{}", sql);
            assert_eq!(sql.matches(AUDIT_COLUMN).count(), 1, "{}", sql);
            assert_eq!(projection_len(&sql), film_columns().len() + 1);
        }
    }
}

#[test]
fn test_query_generation_is_deterministic() {
    for dialect in both_dialects() {
        let first = dialect.generate_extract_query(&film_columns(), "FILM");
        let second = dialect.generate_extract_query(&film_columns(), "FILM");
        assert_eq!(first.as_bytes(), second.as_bytes());
    }
}

#[test]
fn test_catalog_quirks_differ_per_dialect() {
    let oracle = MockDialect::new(OracleDialect::new(oracle_config())).with_catalog(&film_columns());
    let mut conn = oracle.connect().unwrap();
    oracle.introspect_columns(conn.as_mut(), "sakila.film").unwrap();
    assert_eq!(oracle.executed_queries()[0].params, vec!["SAKILA.FILM".to_string()]);

    let db2 = MockDialect::new(Db2Dialect::new(db2_config())).with_catalog(&film_columns());
    let mut conn = db2.connect().unwrap();
    db2.introspect_columns(conn.as_mut(), "sakila.film").unwrap();
    assert_eq!(
        db2.executed_queries()[0].params,
        vec!["film".to_string(), "sakila".to_string()]
    );
}

#[cfg(not(feature = "odbc"))]
#[test]
fn test_connect_without_odbc_feature() {
    for dialect in both_dialects() {
        assert!(matches!(dialect.connect(), Err(DialectError::ConfigError(_))));
    }
}

#[test]
fn test_introspection_of_missing_table() {
    for dialect in both_dialects() {
        let mock = MockDialect::new(ForwardingDialect(dialect)).with_rows(vec![]);
        let mut conn = mock.connect().unwrap();
        let err = mock.introspect_columns(conn.as_mut(), "MISSING").unwrap_err();
        assert!(matches!(err, DialectError::TableNotFound(_)));
    }
}

/// Lets a boxed dialect be wrapped by the mock
struct ForwardingDialect(Box<dyn Dialect>);

impl Dialect for ForwardingDialect {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn connect(&self) -> Result<Box<dyn tablesync_dialect::Connection>, DialectError> {
        self.0.connect()
    }

    fn introspect_columns(
        &self,
        conn: &mut dyn tablesync_dialect::Connection,
        table_name: &str,
    ) -> Result<Vec<ColumnMetadata>, DialectError> {
        self.0.introspect_columns(conn, table_name)
    }

    fn map_type(&self, native_type: &str) -> ValueType {
        self.0.map_type(native_type)
    }

    fn generate_extract_query(&self, columns: &[ColumnMetadata], table_name: &str) -> String {
        self.0.generate_extract_query(columns, table_name)
    }
}

// =============================================================================
// Live database tests (credentials required)
// =============================================================================

#[cfg(feature = "odbc")]
mod live {
    use super::*;

    fn env(key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn live_introspection(dialect: &dyn Dialect, table: &str) {
        let mut conn = dialect.connect().expect("connect");
        let columns = dialect.introspect_columns(conn.as_mut(), table).expect("introspect");
        assert!(!columns.is_empty());

        let mut with_audit = columns.clone();
        with_audit.push(ColumnMetadata::audit());
        let sql = dialect.generate_extract_query(&with_audit, table);

        let mut cursor = conn.query(&sql, &[]).expect("extract query");
        if let Some(row) = cursor.next_row().expect("fetch") {
            let projected = columns.iter().filter(|c| !c.is_excluded()).count();
            assert_eq!(row.len(), projected + 1);
            assert!(row.last().unwrap().as_deref().is_some_and(|ts| !ts.is_empty()));
        }
        drop(cursor);
        conn.close().expect("close");
    }

    #[test]
    #[ignore]
    fn test_oracle_live() {
        let Some(host) = env("TABLESYNC_ORACLE_HOST") else {
            eprintln!("Skipping: TABLESYNC_ORACLE_HOST not set");
            return;
        };

        let config = OracleConfig::new(
            host,
            env("TABLESYNC_ORACLE_PORT").and_then(|p| p.parse().ok()).unwrap_or(1521),
            env("TABLESYNC_ORACLE_USER").unwrap_or_else(|| "system".to_string()),
            env("TABLESYNC_ORACLE_PASSWORD").unwrap_or_default(),
        )
        .with_sid(env("TABLESYNC_ORACLE_SID").unwrap_or_else(|| "xe".to_string()));

        let table = env("TABLESYNC_ORACLE_TABLE").unwrap_or_else(|| "FILM".to_string());
        live_introspection(&OracleDialect::new(config), &table);
    }

    #[test]
    #[ignore]
    fn test_db2_live() {
        let Some(host) = env("TABLESYNC_DB2_HOST") else {
            eprintln!("Skipping: TABLESYNC_DB2_HOST not set");
            return;
        };

        let config = Db2Config::new(
            host,
            env("TABLESYNC_DB2_PORT").and_then(|p| p.parse().ok()).unwrap_or(50000),
            env("TABLESYNC_DB2_DATABASE").unwrap_or_else(|| "SAMPLE".to_string()),
            env("TABLESYNC_DB2_USER").unwrap_or_else(|| "db2inst1".to_string()),
            env("TABLESYNC_DB2_PASSWORD").unwrap_or_default(),
        );

        let table = env("TABLESYNC_DB2_TABLE").unwrap_or_else(|| "DB2INST1.EMPLOYEE".to_string());
        live_introspection(&Db2Dialect::new(config), &table);
    }
}
