//! Source database dialects
//!
//! A dialect knows how to connect to one database engine, read a table's
//! column list from the engine's catalog, map native column types to output
//! value types, and write the extraction query.
//!
//! ## Features
//!
//! Live connections go through ODBC and need the `odbc` Cargo feature plus a
//! driver manager (unixODBC on Linux) and the vendor ODBC driver.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablesync_core::OracleConfig;
//! use tablesync_dialect::{Dialect, OracleDialect};
//!
//! let dialect = OracleDialect::new(
//!     OracleConfig::new("localhost", 1521, "system", "secret").with_sid("xe"),
//! );
//! let mut conn = dialect.connect()?;
//! let columns = dialect.introspect_columns(conn.as_mut(), "FILM")?;
//! let sql = dialect.generate_extract_query(&columns, "FILM");
//! ```

pub mod dialect;
pub mod oracle;
pub mod db2;
pub mod mock;

#[cfg_attr(not(feature = "odbc"), allow(dead_code))]
mod cells;

#[cfg(feature = "odbc")]
pub mod odbc;

pub use dialect::{Connection, Dialect, DialectError, RowCursor, quote_odbc_value};
pub use oracle::OracleDialect;
pub use db2::Db2Dialect;
pub use mock::{ExecutedQuery, MockDialect};

use tablesync_core::SourceConfig;

/// Build the dialect for a configured source
pub fn from_source_config(config: &SourceConfig) -> Box<dyn Dialect> {
    match config {
        SourceConfig::Oracle(c) => Box::new(OracleDialect::new(c.clone())),
        SourceConfig::Db2(c) => Box::new(Db2Dialect::new(c.clone())),
    }
}
